pub mod constants;
pub mod engine;
pub mod error;
pub mod game;
pub mod maze;
pub mod query;
pub mod rng;
pub mod types;
