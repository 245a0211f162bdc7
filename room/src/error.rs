use engine::GameError;
use thiserror::Error;

use crate::display::PendingKey;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store transport error: {0}")]
    Transport(String),

    #[error("Room not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid room code: {0:?}")]
    InvalidRoomCode(String),

    #[error("Action {id} ignored, already applied up to {watermark}")]
    StaleActionIgnored { id: u64, watermark: u64 },

    #[error("An intent is already pending for {0:?}")]
    IntentPending(PendingKey),

    #[error("Intent for {0:?} was not confirmed in time")]
    IntentTimeout(PendingKey),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Retry exhausted: {0}")]
    RetryExhausted(String),
}

impl From<sqlx::Error> for SyncError {
    fn from(value: sqlx::Error) -> Self {
        SyncError::Transport(value.to_string())
    }
}
