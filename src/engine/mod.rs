use crate::constants::{
    required_ghosts, DEATH_PENALTY, FIRE_HIT_SCORE, FIRE_MAX_RANGE, GHOST_KILL_SCORE,
};
use crate::game::{Game, Ghost};
use crate::maze::Maze;
use crate::query::{build_visibility, MoveProvider};
use crate::rng::Rng;
use crate::types::{GameStatus, GhostKind, PlayerCommand, Position};

mod pursuit;
mod spawn_system;
mod utils;

pub use pursuit::PursuitPathfinder;

use utils::open_neighbors;

/// Per-tick orchestrator. Owns the turn-order random source and the pooled
/// pursuit scratch grid; the game itself stays with the caller, which hands
/// it in mutably for exactly one tick at a time.
#[derive(Clone, Debug)]
pub struct TurnProcessor {
    rng: Rng,
    pursuit: PursuitPathfinder,
}

impl TurnProcessor {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: Rng::new(seed),
            pursuit: PursuitPathfinder::new(),
        }
    }

    /// Runs one full tick and reports whether the game is still continuing.
    ///
    /// Phase order is load-bearing for game balance: ghost population
    /// maintenance, transient fire-state reset, player movement, fire
    /// resolution, ghost movement with kill checks, counter advance.
    pub fn advance(&mut self, game: &mut Game, moves: &mut dyn MoveProvider) -> bool {
        match game.status {
            GameStatus::Finished => return false,
            GameStatus::Paused => return true,
            GameStatus::NotStarted => game.status = GameStatus::Running,
            GameStatus::Running => {}
        }

        self.maintain_ghost_population(game);

        game.killed_ghosts.clear();
        for player in &mut game.players {
            player.fire_direction = None;
        }

        self.move_players(game, moves);
        self.resolve_fire(game);
        self.move_ghosts(game);

        game.move_count += 1;
        if game.move_count >= game.move_limit {
            game.status = GameStatus::Finished;
        }

        debug_assert!(
            entities_on_open_cells(game),
            "entity escaped onto a blocked cell"
        );
        game.status != GameStatus::Finished
    }

    /// Players act in a fresh random order every tick; the shuffle decides
    /// conflict resolution order, not correctness. Killed players only burn
    /// their status clock. A failed query costs the player its turn and
    /// nothing else.
    fn move_players(&mut self, game: &mut Game, moves: &mut dyn MoveProvider) {
        let mut order: Vec<usize> = (0..game.players.len()).collect();
        self.rng.shuffle(&mut order);
        for idx in order {
            if game.players[idx].is_killed() {
                game.players[idx].tick_status();
                continue;
            }
            match moves.next_move(&build_visibility(game, idx)) {
                Ok(command) => {
                    self.apply_player_command(game, idx, command);
                }
                Err(_) => {
                    let player = &mut game.players[idx];
                    player.previous = player.position;
                    player.tick_status();
                }
            }
        }
    }

    /// The single player movement rule: fire commands gated by the reload
    /// cooldown, directional moves validated against the grid, and the
    /// status clock ticking regardless of the branch taken.
    fn apply_player_command(
        &mut self,
        game: &mut Game,
        idx: usize,
        command: PlayerCommand,
    ) -> bool {
        let moved = match command {
            PlayerCommand::Fire(dir) => {
                let player = &mut game.players[idx];
                if player.is_reloading() {
                    false
                } else {
                    player.start_reload();
                    player.fire_direction = Some(dir);
                    player.touch();
                    true
                }
            }
            PlayerCommand::Move(dir) => {
                let candidate = game.players[idx].position.step(dir);
                let open = game.maze.is_open(candidate);
                let player = &mut game.players[idx];
                player.previous = player.position;
                if open {
                    player.position = candidate;
                    player.touch();
                }
                open
            }
        };
        game.players[idx].tick_status();
        moved
    }

    /// Ray-casts every pending shot: the ray stops at the first wall within
    /// the maximum range, the truncated range is kept on the player for
    /// rendering and for ghost coverage, and at most the first live player
    /// on the ray takes the hit.
    fn resolve_fire(&mut self, game: &mut Game) {
        for idx in 0..game.players.len() {
            let Some(dir) = game.players[idx].fire_direction else {
                continue;
            };
            if game.players[idx].is_killed() {
                continue;
            }

            let mut cell = game.players[idx].position;
            let mut range = 0;
            let mut victim = None;
            for step in 1..=FIRE_MAX_RANGE {
                cell = cell.step(dir);
                range = step;
                if !game.maze.is_open(cell) {
                    break;
                }
                if victim.is_none() {
                    victim = game.players.iter().enumerate().find_map(|(pidx, other)| {
                        (pidx != idx && !other.is_killed() && other.position == cell)
                            .then_some(pidx)
                    });
                }
            }
            game.players[idx].fire_range = range;

            if let Some(vidx) = victim {
                game.players[idx].score += FIRE_HIT_SCORE;
                game.players[vidx].mark_killed();
                game.players[vidx].score += DEATH_PENALTY;
            }
        }
    }

    /// Ghosts act in a fresh random order; the kill check runs before and
    /// after each ghost's move, and a destroyed ghost is skipped for the
    /// rest of the tick.
    fn move_ghosts(&mut self, game: &mut Game) {
        let mut order: Vec<usize> = (0..game.ghosts.len()).collect();
        self.rng.shuffle(&mut order);
        let mut destroyed = vec![false; game.ghosts.len()];

        for idx in order {
            if destroyed[idx] {
                continue;
            }
            if self.check_ghost_kill(game, idx) {
                destroyed[idx] = true;
                continue;
            }
            self.move_one_ghost(game, idx);
            if self.check_ghost_kill(game, idx) {
                destroyed[idx] = true;
            }
        }

        let mut survivors = Vec::with_capacity(game.ghosts.len());
        for (idx, ghost) in game.ghosts.drain(..).enumerate() {
            if destroyed[idx] {
                game.killed_ghosts.push(ghost);
            } else {
                survivors.push(ghost);
            }
        }
        game.ghosts = survivors;
    }

    /// Resolves at most one outcome for this ghost against the players, in
    /// randomized player order. Same cell: a vulnerable player dies to a
    /// non-neutral ghost, any other overlap destroys the ghost for +50.
    /// Otherwise an active fire ray covering the ghost's cell destroys it.
    fn check_ghost_kill(&mut self, game: &mut Game, ghost_idx: usize) -> bool {
        let ghost_pos = game.ghosts[ghost_idx].position;
        let neutral = game.ghosts[ghost_idx].is_neutral();
        let mut order: Vec<usize> = (0..game.players.len()).collect();
        self.rng.shuffle(&mut order);

        for pidx in order {
            if game.players[pidx].is_killed() {
                continue;
            }
            if game.players[pidx].position == ghost_pos {
                if game.players[pidx].is_vulnerable() && !neutral {
                    game.players[pidx].mark_killed();
                    game.players[pidx].score += DEATH_PENALTY;
                } else {
                    game.players[pidx].score += GHOST_KILL_SCORE;
                }
                return true;
            }
            if fire_covers(game, pidx, ghost_pos) {
                game.players[pidx].score += GHOST_KILL_SCORE;
                return true;
            }
        }
        false
    }

    fn move_one_ghost(&mut self, game: &mut Game, idx: usize) {
        let ghost = game.ghosts[idx].clone();
        let next = match ghost.kind {
            GhostKind::Random => {
                let options = open_neighbors(&game.maze, ghost.position);
                if options.is_empty() {
                    ghost.position
                } else {
                    options[self.rng.pick_index(options.len())].1
                }
            }
            GhostKind::Aggressive => {
                let dir = self.pursuit.next_move(&ghost, game);
                let cell = ghost.position.step(dir);
                if game.maze.is_open(cell) {
                    cell
                } else {
                    ghost.position
                }
            }
        };
        game.ghosts[idx].advance_to(next);
    }
}

/// Whether `cell` lies on this player's resolved fire ray. Cells at or past
/// the terminating wall are never covered.
fn fire_covers(game: &Game, player_idx: usize, cell: Position) -> bool {
    let player = &game.players[player_idx];
    if player.is_killed() {
        return false;
    }
    let Some(dir) = player.fire_direction else {
        return false;
    };
    let mut probe = player.position;
    for _ in 0..player.fire_range {
        probe = probe.step(dir);
        if !game.maze.is_open(probe) {
            return false;
        }
        if probe == cell {
            return true;
        }
    }
    false
}

fn entities_on_open_cells(game: &Game) -> bool {
    game.players
        .iter()
        .all(|player| game.maze.is_open(player.position))
        && game
            .ghosts
            .iter()
            .all(|ghost| game.maze.is_open(ghost.position))
}
