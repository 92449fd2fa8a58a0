use serde::{Deserialize, Serialize};

/// Rotation cycle for the four compass directions. Also the evaluation order
/// used wherever directions are tried deterministically.
pub const COMPASS: [Direction; 4] = [
    Direction::Up,
    Direction::Right,
    Direction::Down,
    Direction::Left,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
    None,
}

impl Direction {
    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    fn cycle_index(self) -> Option<usize> {
        COMPASS.iter().position(|dir| *dir == self)
    }

    pub fn turn_right(self) -> Self {
        match self.cycle_index() {
            Some(idx) => COMPASS[(idx + 1) % 4],
            None => Self::None,
        }
    }

    pub fn turn_left(self) -> Self {
        match self.cycle_index() {
            Some(idx) => COMPASS[(idx + 3) % 4],
            None => Self::None,
        }
    }

    pub fn turn_back(self) -> Self {
        match self.cycle_index() {
            Some(idx) => COMPASS[(idx + 2) % 4],
            None => Self::None,
        }
    }

    /// Direction implied by moving from `previous` to `current`: the axis
    /// with the larger absolute delta wins, ties go to the vertical axis.
    pub fn infer(current: Position, previous: Position) -> Self {
        let d_row = current.row - previous.row;
        let d_col = current.col - previous.col;
        if d_row == 0 && d_col == 0 {
            return Self::None;
        }
        if d_row.abs() >= d_col.abs() {
            if d_row < 0 {
                Self::Up
            } else {
                Self::Down
            }
        } else if d_col < 0 {
            Self::Left
        } else {
            Self::Right
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// New position one cell over in `dir`; `None` stays in place.
    pub fn step(self, dir: Direction) -> Self {
        match dir {
            Direction::Up => Self::new(self.row - 1, self.col),
            Direction::Down => Self::new(self.row + 1, self.col),
            Direction::Left => Self::new(self.row, self.col - 1),
            Direction::Right => Self::new(self.row, self.col + 1),
            Direction::None => self,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Wall,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Regular,
    Powered,
    Reloading,
    Killed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostKind {
    Random,
    Aggressive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    NotStarted,
    Running,
    Paused,
    Finished,
}

/// What a player endpoint may answer with: a directional move or a ranged
/// fire command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    Move(Direction),
    Fire(Direction),
}

impl PlayerCommand {
    /// Wire form: `"up"`, `"down"`, `"left"`, `"right"`, `"none"`, or the
    /// same prefixed with `"fire-"`.
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(rest) = value.strip_prefix("fire-") {
            let dir = Direction::parse_move(rest)?;
            if dir == Direction::None {
                return None;
            }
            return Some(Self::Fire(dir));
        }
        Direction::parse_move(value).map(Self::Move)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub position: Position,
    pub previous: Position,
    pub status: PlayerStatus,
    #[serde(rename = "statusTicks")]
    pub status_ticks: i32,
    #[serde(rename = "fireDirection")]
    pub fire_direction: Option<Direction>,
    #[serde(rename = "fireRange")]
    pub fire_range: i32,
    pub score: i64,
    #[serde(rename = "lastActionMs")]
    pub last_action_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GhostRecord {
    pub position: Position,
    pub previous: Position,
    pub kind: GhostKind,
    pub dir: Direction,
    #[serde(rename = "neutralTicks")]
    pub neutral_ticks: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub height: i32,
    pub width: i32,
    pub tiles: Vec<String>,
    pub players: Vec<PlayerRecord>,
    pub ghosts: Vec<GhostRecord>,
    #[serde(rename = "killedGhosts")]
    pub killed_ghosts: Vec<GhostRecord>,
    #[serde(rename = "minGhosts")]
    pub min_ghosts: u32,
    #[serde(rename = "ghostRate")]
    pub ghost_rate: u32,
    #[serde(rename = "moveCount")]
    pub move_count: u32,
    #[serde(rename = "moveLimit")]
    pub move_limit: u32,
    pub status: GameStatus,
}

#[cfg(test)]
mod tests {
    use super::{Direction, PlayerCommand, Position, COMPASS};

    #[test]
    fn right_then_left_is_identity_for_all_compass_directions() {
        for dir in COMPASS {
            assert_eq!(dir.turn_left().turn_right(), dir);
            assert_eq!(dir.turn_right().turn_left(), dir);
        }
    }

    #[test]
    fn double_reverse_is_identity_for_all_compass_directions() {
        for dir in COMPASS {
            assert_eq!(dir.turn_back().turn_back(), dir);
        }
    }

    #[test]
    fn none_direction_never_rotates() {
        assert_eq!(Direction::None.turn_right(), Direction::None);
        assert_eq!(Direction::None.turn_left(), Direction::None);
        assert_eq!(Direction::None.turn_back(), Direction::None);
    }

    #[test]
    fn infer_prefers_the_vertical_axis_on_ties() {
        let previous = Position::new(4, 4);
        assert_eq!(
            Direction::infer(Position::new(2, 6), previous),
            Direction::Up
        );
        assert_eq!(
            Direction::infer(Position::new(6, 2), previous),
            Direction::Down
        );
    }

    #[test]
    fn infer_picks_the_dominant_axis() {
        let previous = Position::new(4, 4);
        assert_eq!(
            Direction::infer(Position::new(4, 5), previous),
            Direction::Right
        );
        assert_eq!(
            Direction::infer(Position::new(5, 1), previous),
            Direction::Left
        );
        assert_eq!(
            Direction::infer(Position::new(4, 4), previous),
            Direction::None
        );
    }

    #[test]
    fn step_offsets_exactly_one_axis() {
        let origin = Position::new(3, 3);
        assert_eq!(origin.step(Direction::Up), Position::new(2, 3));
        assert_eq!(origin.step(Direction::Down), Position::new(4, 3));
        assert_eq!(origin.step(Direction::Left), Position::new(3, 2));
        assert_eq!(origin.step(Direction::Right), Position::new(3, 4));
        assert_eq!(origin.step(Direction::None), origin);
    }

    #[test]
    fn commands_parse_from_wire_strings() {
        assert_eq!(
            PlayerCommand::parse("left"),
            Some(PlayerCommand::Move(Direction::Left))
        );
        assert_eq!(
            PlayerCommand::parse("none"),
            Some(PlayerCommand::Move(Direction::None))
        );
        assert_eq!(
            PlayerCommand::parse("fire-up"),
            Some(PlayerCommand::Fire(Direction::Up))
        );
        assert_eq!(PlayerCommand::parse("fire-none"), None);
        assert_eq!(PlayerCommand::parse("diagonal"), None);
    }
}
