pub mod event_log;
pub mod round_store;

pub use event_log::{EventLog, StoredEvent};
pub use round_store::{MemoryRoundStore, RoundStore, SqliteRoundStore};

use crate::error::{BlockseedError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlockseedError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // Rounds table: one row per round id, append-then-update, never deleted
        conn.execute(
            "CREATE TABLE IF NOT EXISTS rounds (
                round_id INTEGER PRIMARY KEY,
                seed_block INTEGER NOT NULL,
                commit_block INTEGER NOT NULL,
                committed BOOLEAN NOT NULL,
                revealed BOOLEAN NOT NULL,
                used_extended_history BOOLEAN NOT NULL,
                block_hash TEXT NOT NULL,
                seed TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Event audit table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS seed_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                round_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
