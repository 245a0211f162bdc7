use room::SyncError;
use thiserror::Error;
use types::Phase;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("{players} players but {seats} strategies")]
    SeatMismatch { players: usize, seats: usize },

    #[error("No legal answer for {0}")]
    Stalled(String),

    #[error("Unexpected phase {0}")]
    UnexpectedPhase(Phase),
}
