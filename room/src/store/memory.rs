use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{merge_top_level, RawAction, RemoteStore};
use crate::{error::SyncError, room_code::RoomCode};

#[derive(Debug, Default)]
struct RoomSlot {
    blob: Option<Value>,
    actions: Vec<RawAction>,
    next_id: u64,
}

/// Process-local store. Host and Displays share it through an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<RoomCode, RoomSlot>>,
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, room: &RoomCode) -> Result<Value, SyncError> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room)
            .and_then(|slot| slot.blob.clone())
            .ok_or_else(|| SyncError::NotFound(room.to_string()))
    }

    async fn set(&self, room: &RoomCode, blob: Value) -> Result<(), SyncError> {
        let mut rooms = self.rooms.lock().await;
        rooms.entry(room.clone()).or_default().blob = Some(blob);
        Ok(())
    }

    async fn patch(&self, room: &RoomCode, partial: Value) -> Result<(), SyncError> {
        let mut rooms = self.rooms.lock().await;
        let slot = rooms.entry(room.clone()).or_default();
        let blob = slot.blob.get_or_insert(Value::Null);
        merge_top_level(blob, partial);
        Ok(())
    }

    async fn append_action(&self, room: &RoomCode, msg: Value) -> Result<u64, SyncError> {
        let mut rooms = self.rooms.lock().await;
        let slot = rooms.entry(room.clone()).or_default();
        slot.next_id += 1;
        let id = slot.next_id;
        slot.actions.push(RawAction { id, msg });
        Ok(id)
    }

    async fn drain_actions(&self, room: &RoomCode) -> Result<Vec<RawAction>, SyncError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms
            .get(room)
            .map(|slot| slot.actions.clone())
            .unwrap_or_default())
    }

    async fn clear_actions(&self, room: &RoomCode, upto_id: u64) -> Result<(), SyncError> {
        let mut rooms = self.rooms.lock().await;
        if let Some(slot) = rooms.get_mut(room) {
            slot.actions.retain(|action| action.id > upto_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_room_is_not_found() {
        let store = MemoryStore::default();
        let room: RoomCode = "1234".parse().unwrap();
        assert!(matches!(
            store.get(&room).await,
            Err(SyncError::NotFound(_))
        ));
        assert!(store.drain_actions(&room).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_action_queue() {
        let store = MemoryStore::default();
        let room: RoomCode = "1234".parse().unwrap();
        let other: RoomCode = "5678".parse().unwrap();
        for i in 0..3 {
            store.append_action(&room, json!({"n": i})).await.unwrap();
        }
        assert_eq!(store.append_action(&other, json!({})).await.unwrap(), 1);

        let ids: Vec<u64> = store
            .drain_actions(&room)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        store.clear_actions(&room, 2).await.unwrap();
        let left = store.drain_actions(&room).await.unwrap();
        assert_eq!(left, vec![RawAction { id: 3, msg: json!({"n": 2}) }]);
        // ids keep counting after a clear
        assert_eq!(store.append_action(&room, json!({})).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_patch_creates_and_merges() {
        let store = MemoryStore::default();
        let room: RoomCode = "1234".parse().unwrap();
        store.patch(&room, json!({"hostHeartbeat": 5})).await.unwrap();
        store
            .set(&room, json!({"publicState": {}, "hostHeartbeat": 6}))
            .await
            .unwrap();
        store.patch(&room, json!({"hostHeartbeat": 7})).await.unwrap();
        assert_eq!(
            store.get(&room).await.unwrap(),
            json!({"publicState": {}, "hostHeartbeat": 7})
        );
    }
}
