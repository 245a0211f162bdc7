use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde_json::Value;

use super::{RawAction, RemoteStore};
use crate::{error::SyncError, room_code::RoomCode};

/// Wraps a store and fails a chosen number of upcoming calls, to exercise
/// connectivity and retry paths.
pub struct FlakyStore {
    inner: Arc<dyn RemoteStore>,
    failures_left: AtomicUsize,
    only_op: Mutex<Option<&'static str>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn RemoteStore>) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(0),
            only_op: Mutex::new(None),
        }
    }

    /// Fails the next `calls` calls of any kind.
    pub fn fail_next(&self, calls: usize) {
        self.set_only_op(None);
        self.failures_left.store(calls, Ordering::SeqCst);
    }

    /// Fails the next `calls` calls to `op` (a trait method name) and lets
    /// every other call through.
    pub fn fail_next_on(&self, op: &'static str, calls: usize) {
        self.set_only_op(Some(op));
        self.failures_left.store(calls, Ordering::SeqCst);
    }

    fn set_only_op(&self, op: Option<&'static str>) {
        if let Ok(mut only_op) = self.only_op.lock() {
            *only_op = op;
        }
    }

    fn check(&self, op: &str) -> Result<(), SyncError> {
        let targeted = match self.only_op.lock() {
            Ok(only_op) => only_op.map_or(true, |only| only == op),
            Err(_) => true,
        };
        if !targeted {
            return Ok(());
        }
        let tripped = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(SyncError::Transport(format!("injected failure in {op}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn get(&self, room: &RoomCode) -> Result<Value, SyncError> {
        self.check("get")?;
        self.inner.get(room).await
    }

    async fn set(&self, room: &RoomCode, blob: Value) -> Result<(), SyncError> {
        self.check("set")?;
        self.inner.set(room, blob).await
    }

    async fn patch(&self, room: &RoomCode, partial: Value) -> Result<(), SyncError> {
        self.check("patch")?;
        self.inner.patch(room, partial).await
    }

    async fn append_action(&self, room: &RoomCode, msg: Value) -> Result<u64, SyncError> {
        self.check("append_action")?;
        self.inner.append_action(room, msg).await
    }

    async fn drain_actions(&self, room: &RoomCode) -> Result<Vec<RawAction>, SyncError> {
        self.check("drain_actions")?;
        self.inner.drain_actions(room).await
    }

    async fn clear_actions(&self, room: &RoomCode, upto_id: u64) -> Result<(), SyncError> {
        self.check("clear_actions")?;
        self.inner.clear_actions(room, upto_id).await
    }
}
