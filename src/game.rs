use chrono::Utc;

use crate::constants::{KILLED_TICKS, NEUTRAL_TICKS, POWER_TICKS, RELOAD_TICKS};
use crate::error::EngineError;
use crate::maze::Maze;
use crate::types::{
    Direction, GameRecord, GameStatus, GhostKind, GhostRecord, PlayerRecord, PlayerStatus,
    Position,
};

#[derive(Clone, Debug)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub position: Position,
    pub previous: Position,
    pub status: PlayerStatus,
    pub status_ticks: i32,
    pub fire_direction: Option<Direction>,
    pub fire_range: i32,
    pub score: i64,
    pub last_action_ms: i64,
}

impl Player {
    pub fn new(id: &str, name: &str, endpoint: &str, spawn: Position) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            position: spawn,
            previous: spawn,
            status: PlayerStatus::Regular,
            status_ticks: 0,
            fire_direction: None,
            fire_range: 0,
            score: 0,
            last_action_ms: 0,
        }
    }

    pub fn is_killed(&self) -> bool {
        self.status == PlayerStatus::Killed
    }

    /// A ghost can kill this player on contact.
    pub fn is_vulnerable(&self) -> bool {
        !matches!(self.status, PlayerStatus::Killed | PlayerStatus::Powered)
    }

    pub fn is_reloading(&self) -> bool {
        self.status == PlayerStatus::Reloading
    }

    pub fn grant_power(&mut self) {
        self.status = PlayerStatus::Powered;
        self.status_ticks = POWER_TICKS;
    }

    pub fn start_reload(&mut self) {
        self.status = PlayerStatus::Reloading;
        self.status_ticks = RELOAD_TICKS;
    }

    pub fn mark_killed(&mut self) {
        self.status = PlayerStatus::Killed;
        self.status_ticks = KILLED_TICKS;
        self.fire_direction = None;
        self.fire_range = 0;
    }

    /// Single per-tick status transition. Killed players respawn through an
    /// explicit reloading step before becoming regular again.
    pub fn tick_status(&mut self) {
        if self.status == PlayerStatus::Regular {
            self.status_ticks = 0;
            return;
        }
        self.status_ticks -= 1;
        if self.status_ticks > 0 {
            return;
        }
        match self.status {
            PlayerStatus::Killed => {
                self.status = PlayerStatus::Reloading;
                self.status_ticks = RELOAD_TICKS;
            }
            PlayerStatus::Powered | PlayerStatus::Reloading => {
                self.status = PlayerStatus::Regular;
                self.status_ticks = 0;
            }
            PlayerStatus::Regular => {}
        }
    }

    pub fn touch(&mut self) {
        self.last_action_ms = Utc::now().timestamp_millis();
    }

    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            position: self.position,
            previous: self.previous,
            status: self.status,
            status_ticks: self.status_ticks,
            fire_direction: self.fire_direction,
            fire_range: self.fire_range,
            score: self.score,
            last_action_ms: self.last_action_ms,
        }
    }

    pub fn from_record(record: &PlayerRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            endpoint: record.endpoint.clone(),
            position: record.position,
            previous: record.previous,
            status: record.status,
            status_ticks: record.status_ticks,
            fire_direction: record.fire_direction,
            fire_range: record.fire_range,
            score: record.score,
            last_action_ms: record.last_action_ms,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ghost {
    pub position: Position,
    pub previous: Position,
    pub kind: GhostKind,
    pub dir: Direction,
    pub neutral_ticks: i32,
}

impl Ghost {
    pub fn spawn(kind: GhostKind, at: Position) -> Self {
        Self {
            position: at,
            previous: at,
            kind,
            dir: Direction::None,
            neutral_ticks: NEUTRAL_TICKS,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.neutral_ticks > 0
    }

    /// Applies one movement step. The neutral countdown burns down on every
    /// move, including a blocked one.
    pub fn advance_to(&mut self, next: Position) {
        self.previous = self.position;
        self.position = next;
        self.dir = Direction::infer(self.position, self.previous);
        if self.neutral_ticks > 0 {
            self.neutral_ticks -= 1;
        }
    }

    pub fn to_record(&self) -> GhostRecord {
        GhostRecord {
            position: self.position,
            previous: self.previous,
            kind: self.kind,
            dir: self.dir,
            neutral_ticks: self.neutral_ticks,
        }
    }

    pub fn from_record(record: &GhostRecord) -> Self {
        Self {
            position: record.position,
            previous: record.previous,
            kind: record.kind,
            dir: record.dir,
            neutral_ticks: record.neutral_ticks,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameSettings {
    pub min_ghosts: u32,
    pub ghost_rate: u32,
    pub move_limit: u32,
}

#[derive(Clone, Debug)]
pub struct Game {
    pub id: String,
    pub maze: Maze,
    pub players: Vec<Player>,
    pub ghosts: Vec<Ghost>,
    /// Ghosts destroyed during the current tick; drained at the start of the
    /// next one.
    pub killed_ghosts: Vec<Ghost>,
    pub min_ghosts: u32,
    pub ghost_rate: u32,
    pub move_count: u32,
    pub move_limit: u32,
    pub status: GameStatus,
}

impl Game {
    pub fn create(id: &str, maze: Maze, settings: GameSettings) -> Self {
        Self {
            id: id.to_string(),
            maze,
            players: Vec::new(),
            ghosts: Vec::new(),
            killed_ghosts: Vec::new(),
            min_ghosts: settings.min_ghosts,
            ghost_rate: settings.ghost_rate,
            move_count: 0,
            move_limit: settings.move_limit,
            status: GameStatus::NotStarted,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// Start cells for `count` players, spread evenly over the open interior
    /// in scan order. Deterministic for a given maze.
    pub fn spawn_cells(maze: &Maze, count: usize) -> Vec<Position> {
        let mut open = Vec::new();
        for row in 0..maze.height() {
            for col in 0..maze.width() {
                let pos = Position::new(row, col);
                if maze.is_open(pos) {
                    open.push(pos);
                }
            }
        }
        if open.is_empty() || count == 0 {
            return Vec::new();
        }
        (0..count)
            .map(|idx| open[(idx * open.len() / count) % open.len()])
            .collect()
    }

    pub fn add_player(&mut self, id: &str, name: &str, endpoint: &str, spawn: Position) {
        debug_assert!(self.maze.is_open(spawn), "player spawn on blocked cell");
        self.players.push(Player::new(id, name, endpoint, spawn));
    }

    pub fn to_record(&self) -> GameRecord {
        GameRecord {
            id: self.id.clone(),
            height: self.maze.height(),
            width: self.maze.width(),
            tiles: self.maze.to_tiles(),
            players: self.players.iter().map(Player::to_record).collect(),
            ghosts: self.ghosts.iter().map(Ghost::to_record).collect(),
            killed_ghosts: self.killed_ghosts.iter().map(Ghost::to_record).collect(),
            min_ghosts: self.min_ghosts,
            ghost_rate: self.ghost_rate,
            move_count: self.move_count,
            move_limit: self.move_limit,
            status: self.status,
        }
    }

    pub fn from_record(record: &GameRecord) -> Result<Self, EngineError> {
        let maze = Maze::from_tiles(&record.tiles)?;
        if maze.height() != record.height || maze.width() != record.width {
            return Err(EngineError::MalformedRecord(format!(
                "tile grid is {}x{} but record says {}x{}",
                maze.height(),
                maze.width(),
                record.height,
                record.width
            )));
        }
        for player in &record.players {
            if player.status != PlayerStatus::Killed && !maze.is_open(player.position) {
                return Err(EngineError::MalformedRecord(format!(
                    "player {} on a blocked cell {:?}",
                    player.id, player.position
                )));
            }
        }
        for ghost in &record.ghosts {
            if !maze.is_open(ghost.position) {
                return Err(EngineError::MalformedRecord(format!(
                    "ghost on a blocked cell {:?}",
                    ghost.position
                )));
            }
        }
        Ok(Self {
            id: record.id.clone(),
            maze,
            players: record.players.iter().map(Player::from_record).collect(),
            ghosts: record.ghosts.iter().map(Ghost::from_record).collect(),
            killed_ghosts: record
                .killed_ghosts
                .iter()
                .map(Ghost::from_record)
                .collect(),
            min_ghosts: record.min_ghosts,
            ghost_rate: record.ghost_rate,
            move_count: record.move_count,
            move_limit: record.move_limit,
            status: record.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Game, GameSettings, Ghost, Player};
    use crate::constants::{KILLED_TICKS, POWER_TICKS, RELOAD_TICKS};
    use crate::maze::Maze;
    use crate::rng::Rng;
    use crate::types::{GameStatus, GhostKind, PlayerStatus, Position};

    fn room_5x5() -> Maze {
        Maze::open_room(5, 5).expect("valid dimensions")
    }

    fn settings() -> GameSettings {
        GameSettings {
            min_ghosts: 2,
            ghost_rate: 0,
            move_limit: 100,
        }
    }

    #[test]
    fn powered_state_expires_back_to_regular() {
        let mut player = Player::new("p1", "P1", "http://localhost/p1", Position::new(1, 1));
        player.grant_power();
        assert_eq!(player.status, PlayerStatus::Powered);
        for _ in 0..POWER_TICKS {
            player.tick_status();
        }
        assert_eq!(player.status, PlayerStatus::Regular);
        assert_eq!(player.status_ticks, 0);
    }

    #[test]
    fn killed_players_respawn_through_a_reloading_step() {
        let mut player = Player::new("p1", "P1", "http://localhost/p1", Position::new(1, 1));
        player.mark_killed();
        assert!(player.is_killed());
        for _ in 0..KILLED_TICKS {
            player.tick_status();
        }
        assert_eq!(player.status, PlayerStatus::Reloading);
        assert_eq!(player.status_ticks, RELOAD_TICKS);
        for _ in 0..RELOAD_TICKS {
            player.tick_status();
        }
        assert_eq!(player.status, PlayerStatus::Regular);
    }

    #[test]
    fn killing_a_player_clears_its_fire_state() {
        let mut player = Player::new("p1", "P1", "http://localhost/p1", Position::new(1, 1));
        player.fire_direction = Some(crate::types::Direction::Right);
        player.fire_range = 3;
        player.mark_killed();
        assert_eq!(player.fire_direction, None);
        assert_eq!(player.fire_range, 0);
    }

    #[test]
    fn ghost_neutral_countdown_burns_down_per_move() {
        let mut ghost = Ghost::spawn(GhostKind::Random, Position::new(2, 2));
        assert!(ghost.is_neutral());
        let ticks = ghost.neutral_ticks;
        for step in 0..ticks {
            assert!(ghost.is_neutral(), "still neutral at move {step}");
            ghost.advance_to(ghost.position);
        }
        assert!(!ghost.is_neutral());
    }

    #[test]
    fn ghost_direction_follows_its_last_step() {
        let mut ghost = Ghost::spawn(GhostKind::Aggressive, Position::new(2, 2));
        ghost.advance_to(Position::new(2, 3));
        assert_eq!(ghost.dir, crate::types::Direction::Right);
        assert_eq!(ghost.previous, Position::new(2, 2));
    }

    #[test]
    fn spawn_cells_are_open_and_cover_requested_count() {
        let mut rng = Rng::new(31);
        let maze = Maze::build_random(15, 15, &mut rng).expect("valid dimensions");
        let cells = Game::spawn_cells(&maze, 4);
        assert_eq!(cells.len(), 4);
        for cell in &cells {
            assert!(maze.is_open(*cell));
        }
    }

    #[test]
    fn record_round_trip_preserves_the_full_game_shape() {
        let mut game = Game::create("g1", room_5x5(), settings());
        game.add_player("p1", "P1", "http://localhost/p1", Position::new(1, 1));
        game.players[0].score = -75;
        game.players[0].fire_direction = Some(crate::types::Direction::Left);
        game.players[0].fire_range = 2;
        game.ghosts
            .push(Ghost::spawn(GhostKind::Aggressive, Position::new(3, 3)));
        game.move_count = 12;
        game.status = GameStatus::Running;

        let record = game.to_record();
        let json = serde_json::to_string(&record).expect("record serializes");
        let parsed: crate::types::GameRecord =
            serde_json::from_str(&json).expect("record parses back");
        let restored = Game::from_record(&parsed).expect("record is well formed");

        assert_eq!(restored.players.len(), 1);
        assert_eq!(restored.players[0].score, -75);
        assert_eq!(restored.players[0].fire_range, 2);
        assert_eq!(restored.ghosts.len(), 1);
        assert_eq!(restored.ghosts[0].kind, GhostKind::Aggressive);
        assert_eq!(restored.move_count, 12);
        assert_eq!(restored.status, GameStatus::Running);
    }

    #[test]
    fn loading_rejects_entities_on_blocked_cells() {
        let mut game = Game::create("g1", room_5x5(), settings());
        game.add_player("p1", "P1", "http://localhost/p1", Position::new(1, 1));
        let mut record = game.to_record();
        record.players[0].position = Position::new(0, 0);
        assert!(Game::from_record(&record).is_err());

        let mut record = game.to_record();
        record.ghosts.push(
            Ghost::spawn(GhostKind::Random, Position::new(0, 4)).to_record(),
        );
        assert!(Game::from_record(&record).is_err());
    }
}
