use thiserror::Error;

/// Fatal construction-time failures. Everything past game creation is total:
/// the tick loop never raises.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid maze dimensions: {height}x{width}")]
    InvalidMazeDimensions { height: i32, width: i32 },
    #[error("malformed game record: {0}")]
    MalformedRecord(String),
}

/// Failures of the external player-query collaborator. Always recoverable:
/// the affected player simply submits no move for the tick.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerQueryError {
    #[error("player endpoint timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("endpoint answered with status {0}")]
    Endpoint(u16),
    #[error("response rejected by validation: {0}")]
    Rejected(String),
}
