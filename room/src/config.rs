use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::SyncError,
    store::{MemoryStore, RemoteStore, SqliteStore},
};

pub const STORE_URL_ENV: &str = "ROOM_STORE_URL";
pub const MEMORY_STORE_URL: &str = "memory://";

pub struct StoreConfig {
    pub url: String,
    pub pool_size: u32,
}

impl StoreConfig {
    pub fn from_cli_or_env_or_yaml(cli_arg: Option<String>, yaml_config: Option<String>) -> Self {
        let url = if let Some(arg) = cli_arg {
            arg
        } else if let Ok(env) = std::env::var(STORE_URL_ENV) {
            env
        } else if let Some(yaml) = yaml_config {
            yaml
        } else {
            MEMORY_STORE_URL.to_string()
        };

        Self { url, pool_size: 5 }
    }

    pub async fn connect(&self) -> Result<Arc<dyn RemoteStore>, SyncError> {
        if self.url == MEMORY_STORE_URL {
            return Ok(Arc::new(MemoryStore::default()));
        }
        if self.url.starts_with("sqlite:") {
            let store = SqliteStore::connect(&self.url, self.pool_size).await?;
            return Ok(Arc::new(store));
        }
        Err(SyncError::Transport(format!(
            "Unsupported store url: {}",
            self.url
        )))
    }
}

/// Polling cadence and thresholds shared by Host and Display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    pub host_poll_ms: u64,
    pub display_poll_ms: u64,
    pub heartbeat_ms: u64,
    pub failures_to_disconnect: u32,
    pub intent_timeout_ms: u64,
    pub presence_timeout_ms: u64,
    pub retry_attempts: usize,
    pub retry_initial_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host_poll_ms: 600,
            display_poll_ms: 800,
            heartbeat_ms: 2000,
            failures_to_disconnect: 6,
            intent_timeout_ms: 12_000,
            presence_timeout_ms: 60_000,
            retry_attempts: 3,
            retry_initial_delay_ms: 250,
        }
    }
}

impl SyncConfig {
    pub fn host_poll(&self) -> Duration {
        Duration::from_millis(self.host_poll_ms)
    }

    pub fn display_poll(&self) -> Duration {
        Duration::from_millis(self.display_poll_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn intent_timeout(&self) -> Duration {
        Duration::from_millis(self.intent_timeout_ms)
    }

    pub fn presence_timeout(&self) -> Duration {
        Duration::from_millis(self.presence_timeout_ms)
    }

    pub fn retry_initial_delay(&self) -> Duration {
        Duration::from_millis(self.retry_initial_delay_ms)
    }

    /// Age past which a Host heartbeat counts as a missed beat on a Display.
    pub fn heartbeat_stale_after_ms(&self) -> i64 {
        (self.heartbeat_ms * self.failures_to_disconnect as u64) as i64
    }
}
