use crate::game::{Game, Ghost};
use crate::maze::Maze;
use crate::types::{Direction, Position, COMPASS};

/// Overlay sentinel for cells a walk may never enter (walls and the border
/// ring).
const BLOCKED: i32 = -1;
/// Overlay sentinel for cells a walk entered and later abandoned.
const DEAD_END: i32 = -2;

/// Movement decision for aggressive ghosts.
///
/// This is deliberately a wall-following exploratory walk with single-point
/// backtracking, not a shortest-path search: it is cheap enough to run for
/// every aggressive ghost every tick and yields slightly imperfect pursuit.
/// The visit-order overlay is pooled here so spawning and killing ghosts
/// stays free of per-ghost scratch state.
#[derive(Clone, Debug, Default)]
pub struct PursuitPathfinder {
    overlay: Vec<i32>,
    height: i32,
    width: i32,
}

impl PursuitPathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direction the ghost should move this tick. Deterministic for a given
    /// maze and set of vulnerable player positions; does not touch the game.
    /// When every candidate walk fails the ghost keeps its current heading.
    pub fn next_move(&mut self, ghost: &Ghost, game: &Game) -> Direction {
        let targets: Vec<Position> = game
            .players
            .iter()
            .filter(|player| player.is_vulnerable())
            .map(|player| player.position)
            .collect();
        if targets.is_empty() {
            return ghost.dir;
        }

        for dir in COMPASS {
            let cell = ghost.position.step(dir);
            if game.maze.is_open(cell) && targets.contains(&cell) {
                return dir;
            }
        }

        let mut best: Option<(u32, Direction)> = None;
        for dir in COMPASS {
            if !game.maze.is_open(ghost.position.step(dir)) {
                continue;
            }
            if let Some(steps) = self.walk(ghost.position, dir, &game.maze, &targets) {
                if best.map(|(shortest, _)| steps < shortest).unwrap_or(true) {
                    best = Some((steps, dir));
                }
            }
        }
        best.map(|(_, dir)| dir).unwrap_or(ghost.dir)
    }

    /// One exploratory walk seeded in `seed`. Returns the number of steps a
    /// ghost following it would take to land on a target, or `None` when the
    /// walk exhausts its backtracking options.
    fn walk(
        &mut self,
        start: Position,
        seed: Direction,
        maze: &Maze,
        targets: &[Position],
    ) -> Option<u32> {
        self.reset(maze);
        let mut current = start;
        let mut heading = seed;
        let mut counter: i32 = 1;
        self.set(current, counter);
        let mut steps: u32 = 0;

        loop {
            // Landing on a target from here ends the walk, whichever of the
            // four relative directions gets there.
            for candidate in [
                heading,
                heading.turn_right(),
                heading.turn_left(),
                heading.turn_back(),
            ] {
                if targets.contains(&current.step(candidate)) {
                    return Some(steps + 1);
                }
            }

            // Straight ahead beats a right turn beats a left turn, as long
            // as the cell is open and unvisited.
            let mut advanced = false;
            for candidate in [heading, heading.turn_right(), heading.turn_left()] {
                let cell = current.step(candidate);
                if self.visit(cell) == Some(0) {
                    counter += 1;
                    self.set(cell, counter);
                    current = cell;
                    heading = candidate;
                    steps += 1;
                    advanced = true;
                    break;
                }
            }
            if advanced {
                continue;
            }

            // Dead end: retreat to the most recently visited neighbor on the
            // path, abandoning this cell for the rest of the walk.
            let here = self.visit(current).unwrap_or(DEAD_END);
            self.set(current, DEAD_END);
            let mut retreat: Option<(i32, Position)> = None;
            for dir in COMPASS {
                let cell = current.step(dir);
                if let Some(number) = self.visit(cell) {
                    if number > 0
                        && number < here
                        && retreat.map(|(best, _)| number > best).unwrap_or(true)
                    {
                        retreat = Some((number, cell));
                    }
                }
            }
            let (_, cell) = retreat?;
            heading = Direction::infer(cell, current);
            current = cell;
            steps += 1;
        }
    }

    /// Rebuilds the overlay for this maze: 0 for visitable interior cells,
    /// `BLOCKED` for everything else.
    fn reset(&mut self, maze: &Maze) {
        self.height = maze.height();
        self.width = maze.width();
        self.overlay.clear();
        self.overlay
            .resize((self.height * self.width) as usize, BLOCKED);
        for row in 1..self.height - 1 {
            for col in 1..self.width - 1 {
                let pos = Position::new(row, col);
                if maze.is_open(pos) {
                    self.overlay[(row * self.width + col) as usize] = 0;
                }
            }
        }
    }

    fn visit(&self, pos: Position) -> Option<i32> {
        if pos.row < 0 || pos.col < 0 || pos.row >= self.height || pos.col >= self.width {
            return None;
        }
        Some(self.overlay[(pos.row * self.width + pos.col) as usize])
    }

    fn set(&mut self, pos: Position, value: i32) {
        if pos.row >= 0 && pos.col >= 0 && pos.row < self.height && pos.col < self.width {
            self.overlay[(pos.row * self.width + pos.col) as usize] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PursuitPathfinder;
    use crate::game::{Game, GameSettings, Ghost, Player};
    use crate::maze::Maze;
    use crate::rng::Rng;
    use crate::types::{CellKind, Direction, GhostKind, Position};

    fn room_game(height: i32, width: i32) -> Game {
        Game::create(
            "pursuit-test",
            Maze::open_room(height, width).expect("valid dimensions"),
            GameSettings {
                min_ghosts: 0,
                ghost_rate: 0,
                move_limit: 100,
            },
        )
    }

    fn add_player(game: &mut Game, id: &str, at: Position) {
        game.players
            .push(Player::new(id, id, "http://localhost/agent", at));
    }

    #[test]
    fn adjacent_vulnerable_player_wins_without_a_search() {
        let mut game = room_game(7, 7);
        add_player(&mut game, "p1", Position::new(3, 2));
        let ghost = Ghost::spawn(GhostKind::Aggressive, Position::new(3, 3));

        let mut pathfinder = PursuitPathfinder::new();
        assert_eq!(pathfinder.next_move(&ghost, &game), Direction::Left);
    }

    #[test]
    fn powered_and_killed_players_are_not_targets() {
        let mut game = room_game(7, 7);
        add_player(&mut game, "p1", Position::new(3, 2));
        game.players[0].grant_power();
        let mut ghost = Ghost::spawn(GhostKind::Aggressive, Position::new(3, 3));
        ghost.dir = Direction::Down;

        let mut pathfinder = PursuitPathfinder::new();
        assert_eq!(pathfinder.next_move(&ghost, &game), Direction::Down);

        game.players[0].mark_killed();
        assert_eq!(pathfinder.next_move(&ghost, &game), Direction::Down);
    }

    #[test]
    fn repeated_invocations_return_the_same_direction() {
        let mut rng = Rng::new(404);
        let maze = Maze::build_random(15, 15, &mut rng).expect("valid dimensions");
        let mut game = Game::create(
            "pursuit-test",
            maze,
            GameSettings {
                min_ghosts: 0,
                ghost_rate: 0,
                move_limit: 100,
            },
        );
        let spawns = Game::spawn_cells(&game.maze, 2);
        add_player(&mut game, "p1", spawns[0]);
        let ghost = Ghost::spawn(GhostKind::Aggressive, spawns[1]);

        let mut pathfinder = PursuitPathfinder::new();
        let first = pathfinder.next_move(&ghost, &game);
        for _ in 0..10 {
            assert_eq!(pathfinder.next_move(&ghost, &game), first);
        }
    }

    #[test]
    fn open_room_pursuit_closes_distance_within_four_ticks() {
        let mut game = room_game(5, 5);
        add_player(&mut game, "p1", Position::new(1, 1));
        let mut ghost = Ghost::spawn(GhostKind::Aggressive, Position::new(3, 3));

        let mut pathfinder = PursuitPathfinder::new();
        let target = game.players[0].position;
        let mut distance = (ghost.position.row - target.row).abs()
            + (ghost.position.col - target.col).abs();
        for _ in 0..4 {
            let dir = pathfinder.next_move(&ghost, &game);
            let next = ghost.position.step(dir);
            assert!(game.maze.is_open(next), "pathfinder chose a blocked cell");
            ghost.advance_to(next);
            let now = (ghost.position.row - target.row).abs()
                + (ghost.position.col - target.col).abs();
            assert!(now < distance, "pursuit failed to close distance");
            distance = now;
            if distance <= 1 {
                return;
            }
        }
        panic!("ghost never got adjacent to the player");
    }

    #[test]
    fn walled_off_target_keeps_the_current_heading() {
        let mut game = room_game(7, 7);
        // Box the player into (1,1) completely.
        for cell in [Position::new(1, 2), Position::new(2, 1), Position::new(2, 2)] {
            game.maze.set_cell(cell, CellKind::Wall);
        }
        add_player(&mut game, "p1", Position::new(1, 1));
        let mut ghost = Ghost::spawn(GhostKind::Aggressive, Position::new(4, 4));
        ghost.dir = Direction::Up;

        let mut pathfinder = PursuitPathfinder::new();
        assert_eq!(pathfinder.next_move(&ghost, &game), Direction::Up);
    }

    #[test]
    fn corridor_walk_backtracks_out_of_a_dead_end() {
        // 7x9 room with a pocket: the straight-preferring walk enters the
        // dead end, backtracks, and still finds the player.
        let mut game = room_game(7, 9);
        for cell in [
            Position::new(2, 2),
            Position::new(2, 3),
            Position::new(2, 4),
            Position::new(2, 5),
            Position::new(3, 5),
            Position::new(4, 5),
            Position::new(4, 4),
            Position::new(4, 3),
        ] {
            game.maze.set_cell(cell, CellKind::Wall);
        }
        add_player(&mut game, "p1", Position::new(1, 7));
        let ghost = Ghost::spawn(GhostKind::Aggressive, Position::new(3, 3));

        let mut pathfinder = PursuitPathfinder::new();
        let dir = pathfinder.next_move(&ghost, &game);
        assert_ne!(dir, Direction::None);
        assert!(game.maze.is_open(ghost.position.step(dir)));
    }
}
