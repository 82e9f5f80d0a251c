use crate::error::{BlockseedError, Result};
use crate::storage::Storage;
use crate::types::{BlockHash, RoundId, RoundRecord, Seed};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rusqlite::params;
use std::collections::HashMap;
use std::sync::Arc;

/// Keyed store of per-round records.
///
/// `insert` is strict: a second insert for the same round id is an error, so
/// an earlier commit can never be overwritten.
#[async_trait]
pub trait RoundStore: Send + Sync {
    async fn insert(&self, record: &RoundRecord) -> Result<()>;
    async fn get(&self, round_id: RoundId) -> Result<Option<RoundRecord>>;
    async fn update(&self, record: &RoundRecord) -> Result<()>;
    async fn list(&self) -> Result<Vec<RoundRecord>>;
}

/// In-memory store. Each engine instance gets its own map, so tests can run
/// several engines side by side without interference.
#[derive(Default)]
pub struct MemoryRoundStore {
    rounds: RwLock<HashMap<RoundId, RoundRecord>>,
}

impl MemoryRoundStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoundStore for MemoryRoundStore {
    async fn insert(&self, record: &RoundRecord) -> Result<()> {
        let mut rounds = self.rounds.write();
        if rounds.contains_key(&record.round_id) {
            return Err(BlockseedError::DuplicateRound(record.round_id));
        }
        rounds.insert(record.round_id, record.clone());
        Ok(())
    }

    async fn get(&self, round_id: RoundId) -> Result<Option<RoundRecord>> {
        Ok(self.rounds.read().get(&round_id).cloned())
    }

    async fn update(&self, record: &RoundRecord) -> Result<()> {
        let mut rounds = self.rounds.write();
        rounds.insert(record.round_id, record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RoundRecord>> {
        let mut records: Vec<RoundRecord> = self.rounds.read().values().cloned().collect();
        records.sort_by_key(|r| r.round_id);
        Ok(records)
    }
}

/// Sqlite-backed store for deployments that need the audit trail to survive
/// restarts.
pub struct SqliteRoundStore {
    storage: Arc<Storage>,
}

impl SqliteRoundStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl RoundStore for SqliteRoundStore {
    async fn insert(&self, record: &RoundRecord) -> Result<()> {
        let conn = self.storage.get_connection().await;

        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM rounds WHERE round_id = ?1",
                params![record.round_id as i64],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)?;
        if exists {
            return Err(BlockseedError::DuplicateRound(record.round_id));
        }

        conn.execute(
            "INSERT INTO rounds
             (round_id, seed_block, commit_block, committed, revealed,
              used_extended_history, block_hash, seed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.round_id as i64,
                record.seed_block as i64,
                record.commit_block as i64,
                record.committed,
                record.revealed,
                record.used_extended_history,
                record.block_hash.to_hex(),
                record.seed.to_hex(),
                Utc::now().timestamp(),
            ],
        )?;

        tracing::info!(
            "Stored round {} targeting block {}",
            record.round_id,
            record.seed_block
        );
        Ok(())
    }

    async fn get(&self, round_id: RoundId) -> Result<Option<RoundRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT round_id, seed_block, commit_block, committed, revealed,
                    used_extended_history, block_hash, seed
             FROM rounds WHERE round_id = ?1",
        )?;

        let mut rows = stmt.query_map(params![round_id as i64], row_to_record)?;
        match rows.next() {
            Some(record) => Ok(Some(record?)),
            None => Ok(None),
        }
    }

    async fn update(&self, record: &RoundRecord) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "UPDATE rounds
             SET revealed = ?2, used_extended_history = ?3, block_hash = ?4, seed = ?5
             WHERE round_id = ?1",
            params![
                record.round_id as i64,
                record.revealed,
                record.used_extended_history,
                record.block_hash.to_hex(),
                record.seed.to_hex(),
            ],
        )?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<RoundRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT round_id, seed_block, commit_block, committed, revealed,
                    used_extended_history, block_hash, seed
             FROM rounds ORDER BY round_id ASC",
        )?;

        let rows = stmt.query_map([], row_to_record)?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoundRecord> {
    let round_id: i64 = row.get(0)?;
    let seed_block: i64 = row.get(1)?;
    let commit_block: i64 = row.get(2)?;
    let block_hash_hex: String = row.get(6)?;
    let seed_hex: String = row.get(7)?;

    let block_hash = BlockHash::from_hex(&block_hash_hex).map_err(|_| {
        rusqlite::Error::InvalidColumnType(6, "block_hash".to_string(), rusqlite::types::Type::Text)
    })?;
    let seed = Seed::from_hex(&seed_hex).map_err(|_| {
        rusqlite::Error::InvalidColumnType(7, "seed".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(RoundRecord {
        round_id: round_id as u64,
        seed_block: seed_block as u64,
        commit_block: commit_block as u64,
        committed: row.get(3)?,
        revealed: row.get(4)?,
        used_extended_history: row.get(5)?,
        block_hash,
        seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn sqlite_store() -> (tempfile::TempDir, SqliteRoundStore) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(&dir.path().join("rounds.db")).await.unwrap());
        (dir, SqliteRoundStore::new(storage))
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let (_dir, store) = sqlite_store().await;

        let mut record = RoundRecord::committed(3, 100, 102);
        store.insert(&record).await.unwrap();

        record.revealed = true;
        record.block_hash = BlockHash::new([0x11; 32]);
        record.seed = Seed::new([0x22; 32]);
        record.used_extended_history = true;
        store.update(&record).await.unwrap();

        let loaded = store.get(3).await.unwrap().unwrap();
        assert!(loaded.revealed);
        assert!(loaded.used_extended_history);
        assert_eq!(loaded.block_hash, record.block_hash);
        assert_eq!(loaded.seed, record.seed);
        assert_eq!(loaded.commit_block, 100);
        assert_eq!(loaded.seed_block, 102);
    }

    #[tokio::test]
    async fn test_sqlite_duplicate_insert_rejected() {
        let (_dir, store) = sqlite_store().await;

        let record = RoundRecord::committed(5, 10, 12);
        store.insert(&record).await.unwrap();
        assert!(matches!(
            store.insert(&record).await,
            Err(BlockseedError::DuplicateRound(5))
        ));
    }

    #[tokio::test]
    async fn test_sqlite_list_ordered() {
        let (_dir, store) = sqlite_store().await;

        for id in [9u64, 2, 4] {
            store
                .insert(&RoundRecord::committed(id, 10, 12))
                .await
                .unwrap();
        }
        let ids: Vec<u64> = store.list().await.unwrap().iter().map(|r| r.round_id).collect();
        assert_eq!(ids, vec![2, 4, 9]);
    }

    #[tokio::test]
    async fn test_memory_store_behaves_like_sqlite() {
        let store = MemoryRoundStore::new();
        let record = RoundRecord::committed(1, 10, 12);
        store.insert(&record).await.unwrap();
        assert!(store.insert(&record).await.is_err());
        assert!(store.get(1).await.unwrap().is_some());
        assert!(store.get(2).await.unwrap().is_none());
    }
}
