/// Maximum length of a fire ray, in cells. A ray still stops earlier at the
/// first wall it meets.
pub const FIRE_MAX_RANGE: i32 = 5;

/// Ticks a player spends reloading after an accepted fire command.
pub const RELOAD_TICKS: i32 = 5;

/// Ticks the powered state lasts once granted.
pub const POWER_TICKS: i32 = 20;

/// Ticks a killed player stays down before entering the reloading respawn
/// step.
pub const KILLED_TICKS: i32 = 10;

/// Ticks a freshly spawned ghost stays neutral (cannot kill).
pub const NEUTRAL_TICKS: i32 = 5;

/// Half-width of the square visibility window sent to player endpoints.
pub const VIEW_RADIUS: i32 = 5;

pub const FIRE_HIT_SCORE: i64 = 100;
pub const GHOST_KILL_SCORE: i64 = 50;
pub const DEATH_PENALTY: i64 = -25;

pub const DEFAULT_MIN_GHOSTS: u32 = 2;
pub const DEFAULT_GHOST_RATE: u32 = 50;
pub const DEFAULT_MOVE_LIMIT: u32 = 500;

/// Recommended lower bound for generated maze dimensions; recursive division
/// halts below this on either axis and leaves the region open.
pub const MIN_DIVISIBLE_SPAN: i32 = 5;

/// Required ghost population for a given move counter. The divisor ramps the
/// floor up as the match progresses; a zero rate keeps it flat.
pub fn required_ghosts(min_ghosts: u32, ghost_rate: u32, move_count: u32) -> u32 {
    if ghost_rate == 0 {
        return min_ghosts;
    }
    min_ghosts + move_count / ghost_rate
}
