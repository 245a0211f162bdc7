pub mod config;
pub mod error;
pub mod gameplay;

pub use config::SimulationConfig;
pub use error::SimulationError;
pub use gameplay::{run_game, GameSummary};
