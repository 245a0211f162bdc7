use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};

use super::{merge_top_level, RawAction, RemoteStore};
use crate::{error::SyncError, room_code::RoomCode};

/// Store backed by a sqlite database, so Host and Displays can run as separate
/// processes on one machine.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self, SyncError> {
        // every connection to an in-memory database gets its own database
        let max_connections = if url.contains(":memory:") { 1 } else { pool_size };
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let store = Self::new(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), SyncError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                room TEXT PRIMARY KEY,
                blob TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room TEXT NOT NULL,
                msg TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn get(&self, room: &RoomCode) -> Result<Value, SyncError> {
        let row = sqlx::query("SELECT blob FROM rooms WHERE room = ?")
            .bind(room.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let blob: String = row.get("blob");
                Ok(serde_json::from_str(&blob)?)
            }
            None => Err(SyncError::NotFound(room.to_string())),
        }
    }

    async fn set(&self, room: &RoomCode, blob: Value) -> Result<(), SyncError> {
        let blob = serde_json::to_string(&blob)?;
        sqlx::query(
            "INSERT INTO rooms (room, blob) VALUES (?, ?)
             ON CONFLICT(room) DO UPDATE SET blob = excluded.blob",
        )
        .bind(room.as_str())
        .bind(blob)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn patch(&self, room: &RoomCode, partial: Value) -> Result<(), SyncError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT blob FROM rooms WHERE room = ?")
            .bind(room.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let mut blob = match row {
            Some(row) => serde_json::from_str(&row.get::<String, _>("blob"))?,
            None => Value::Null,
        };
        merge_top_level(&mut blob, partial);
        sqlx::query(
            "INSERT INTO rooms (room, blob) VALUES (?, ?)
             ON CONFLICT(room) DO UPDATE SET blob = excluded.blob",
        )
        .bind(room.as_str())
        .bind(serde_json::to_string(&blob)?)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_action(&self, room: &RoomCode, msg: Value) -> Result<u64, SyncError> {
        let result = sqlx::query("INSERT INTO actions (room, msg) VALUES (?, ?)")
            .bind(room.as_str())
            .bind(serde_json::to_string(&msg)?)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid() as u64)
    }

    async fn drain_actions(&self, room: &RoomCode) -> Result<Vec<RawAction>, SyncError> {
        let rows = sqlx::query("SELECT id, msg FROM actions WHERE room = ? ORDER BY id")
            .bind(room.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let id: i64 = row.get("id");
                let msg: String = row.get("msg");
                Ok(RawAction {
                    id: id as u64,
                    msg: serde_json::from_str(&msg)?,
                })
            })
            .collect()
    }

    async fn clear_actions(&self, room: &RoomCode, upto_id: u64) -> Result<(), SyncError> {
        sqlx::query("DELETE FROM actions WHERE room = ? AND id <= ?")
            .bind(room.as_str())
            .bind(upto_id as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
