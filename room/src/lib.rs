//! Host/Display room coordination over a passive remote store.

pub mod blob;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod error;
pub mod host;
pub mod retry;
pub mod room_code;
pub mod store;

pub use blob::{DisplayView, HostView, RoomBlob};
pub use config::{StoreConfig, SyncConfig};
pub use connectivity::Connectivity;
pub use display::{fingerprint, DisplaySync, DisplayUpdate, PendingKey};
pub use error::SyncError;
pub use host::{HostStatus, HostSync, TickReport};
pub use retry::retry_with_backoff;
pub use room_code::RoomCode;
pub use store::{FlakyStore, MemoryStore, RawAction, RemoteStore, SqliteStore};

/// Wall clock in epoch milliseconds, the unit of `endAt` and `hostHeartbeat`.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
