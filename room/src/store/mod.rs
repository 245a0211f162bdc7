//! The passive remote blob store shared by Host and Displays. It supports
//! independent reads and writes only: no push, no transactions across calls.

mod flaky;
mod memory;
mod sqlite;

pub use flaky::FlakyStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::ActionMessage;

use crate::{error::SyncError, room_code::RoomCode};

/// A queued intent as stored, before the Host decodes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    pub id: u64,
    pub msg: Value,
}

impl RawAction {
    pub fn decode(self) -> Result<ActionMessage, serde_json::Error> {
        Ok(ActionMessage {
            id: self.id,
            msg: serde_json::from_value(self.msg)?,
        })
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fails with [`SyncError::NotFound`] when the room was never written.
    async fn get(&self, room: &RoomCode) -> Result<Value, SyncError>;
    async fn set(&self, room: &RoomCode, blob: Value) -> Result<(), SyncError>;
    /// Shallow merge of the top-level keys of `partial` into the blob.
    async fn patch(&self, room: &RoomCode, partial: Value) -> Result<(), SyncError>;
    /// Appends to the room's action queue, returning the assigned id. Ids are
    /// monotonic per room.
    async fn append_action(&self, room: &RoomCode, msg: Value) -> Result<u64, SyncError>;
    /// Every queued action in id order. Nothing is removed.
    async fn drain_actions(&self, room: &RoomCode) -> Result<Vec<RawAction>, SyncError>;
    /// Removes queued actions with `id <= upto_id`.
    async fn clear_actions(&self, room: &RoomCode, upto_id: u64) -> Result<(), SyncError>;
}

pub(crate) fn merge_top_level(blob: &mut Value, partial: Value) {
    if !blob.is_object() {
        *blob = Value::Object(Default::default());
    }
    if let (Value::Object(target), Value::Object(source)) = (blob, partial) {
        for (key, value) in source {
            target.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_is_shallow() {
        let mut blob = json!({"publicState": {"phase": "DAY"}, "hostHeartbeat": 1});
        merge_top_level(&mut blob, json!({"hostHeartbeat": 2}));
        assert_eq!(
            blob,
            json!({"publicState": {"phase": "DAY"}, "hostHeartbeat": 2})
        );
        merge_top_level(&mut blob, json!({"publicState": {"night": 2}}));
        assert_eq!(blob["publicState"], json!({"night": 2}));
    }
}
