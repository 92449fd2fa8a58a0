use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::constants::VIEW_RADIUS;
use crate::error::PlayerQueryError;
use crate::game::Game;
use crate::rng::Rng;
use crate::types::{
    Direction, GhostKind, PlayerCommand, PlayerStatus, Position, COMPASS,
};

/// What a player endpoint gets to see when asked for its next move: a square
/// sub-window of the maze centered on the player, plus the entities inside
/// it.
#[derive(Clone, Debug, Serialize)]
pub struct PlayerVisibility {
    #[serde(rename = "gameId")]
    pub game_id: String,
    #[serde(rename = "playerId")]
    pub player_id: String,
    /// Top-left corner of the window in maze coordinates.
    pub origin: Position,
    pub tiles: Vec<String>,
    pub players: Vec<VisiblePlayer>,
    pub ghosts: Vec<VisibleGhost>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VisiblePlayer {
    pub id: String,
    pub position: Position,
    pub status: PlayerStatus,
}

#[derive(Clone, Debug, Serialize)]
pub struct VisibleGhost {
    pub position: Position,
    pub kind: GhostKind,
    pub neutral: bool,
}

/// The player-query collaborator. The HTTP transport that implements this
/// against live endpoints lives outside the engine; any error degrades to
/// "no move submitted this tick" for that player alone.
pub trait MoveProvider {
    fn next_move(&mut self, view: &PlayerVisibility) -> Result<PlayerCommand, PlayerQueryError>;
}

/// Visibility-limited snapshot for one player, window clamped to the grid.
pub fn build_visibility(game: &Game, player_idx: usize) -> PlayerVisibility {
    let player = &game.players[player_idx];
    let row_min = (player.position.row - VIEW_RADIUS).max(0);
    let row_max = (player.position.row + VIEW_RADIUS).min(game.maze.height() - 1);
    let col_min = (player.position.col - VIEW_RADIUS).max(0);
    let col_max = (player.position.col + VIEW_RADIUS).min(game.maze.width() - 1);
    let inside = |pos: Position| {
        pos.row >= row_min && pos.row <= row_max && pos.col >= col_min && pos.col <= col_max
    };

    let tiles = (row_min..=row_max)
        .map(|row| {
            (col_min..=col_max)
                .map(|col| {
                    if game.maze.is_open(Position::new(row, col)) {
                        '.'
                    } else {
                        '#'
                    }
                })
                .collect()
        })
        .collect();

    PlayerVisibility {
        game_id: game.id.clone(),
        player_id: player.id.clone(),
        origin: Position::new(row_min, col_min),
        tiles,
        players: game
            .players
            .iter()
            .enumerate()
            .filter(|(idx, other)| *idx != player_idx && inside(other.position))
            .map(|(_, other)| VisiblePlayer {
                id: other.id.clone(),
                position: other.position,
                status: other.status,
            })
            .collect(),
        ghosts: game
            .ghosts
            .iter()
            .filter(|ghost| inside(ghost.position))
            .map(|ghost| VisibleGhost {
                position: ghost.position,
                kind: ghost.kind,
                neutral: ghost.is_neutral(),
            })
            .collect(),
    }
}

/// Per-player command queues for tests and offline matches. Players with an
/// exhausted queue stand still.
#[derive(Debug, Default)]
pub struct ScriptedMoves {
    queues: HashMap<String, VecDeque<Result<PlayerCommand, PlayerQueryError>>>,
}

impl ScriptedMoves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, player_id: &str, result: Result<PlayerCommand, PlayerQueryError>) {
        self.queues
            .entry(player_id.to_string())
            .or_default()
            .push_back(result);
    }
}

impl MoveProvider for ScriptedMoves {
    fn next_move(&mut self, view: &PlayerVisibility) -> Result<PlayerCommand, PlayerQueryError> {
        self.queues
            .get_mut(&view.player_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(PlayerCommand::Move(Direction::None)))
    }
}

/// Seeded drunken-walk agent for offline matches: mostly walks, sometimes
/// fires.
#[derive(Clone, Debug)]
pub struct RandomWalker {
    rng: Rng,
    fire_chance: f32,
}

impl RandomWalker {
    pub fn new(seed: u32, fire_chance: f32) -> Self {
        Self {
            rng: Rng::new(seed),
            fire_chance,
        }
    }
}

impl MoveProvider for RandomWalker {
    fn next_move(&mut self, _view: &PlayerVisibility) -> Result<PlayerCommand, PlayerQueryError> {
        let dir = COMPASS[self.rng.pick_index(COMPASS.len())];
        if self.rng.bool(self.fire_chance) {
            Ok(PlayerCommand::Fire(dir))
        } else {
            Ok(PlayerCommand::Move(dir))
        }
    }
}
