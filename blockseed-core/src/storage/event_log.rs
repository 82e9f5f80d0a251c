use crate::error::Result;
use crate::storage::Storage;
use crate::types::RoundId;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A persisted protocol event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub round_id: RoundId,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit log of protocol events for keepers and indexers.
pub struct EventLog {
    storage: Arc<Storage>,
}

impl EventLog {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn append(
        &self,
        round_id: RoundId,
        kind: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT INTO seed_events (round_id, kind, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                round_id as i64,
                kind,
                serde_json::to_string(payload)?,
                Utc::now().timestamp(),
            ],
        )?;

        Ok(())
    }

    pub async fn load_for_round(&self, round_id: RoundId) -> Result<Vec<StoredEvent>> {
        self.load("SELECT round_id, kind, payload, created_at FROM seed_events WHERE round_id = ?1 ORDER BY id ASC", Some(round_id)).await
    }

    pub async fn load_all(&self) -> Result<Vec<StoredEvent>> {
        self.load(
            "SELECT round_id, kind, payload, created_at FROM seed_events ORDER BY id ASC",
            None,
        )
        .await
    }

    async fn load(&self, sql: &str, round_id: Option<RoundId>) -> Result<Vec<StoredEvent>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            let round_id: i64 = row.get(0)?;
            let kind: String = row.get(1)?;
            let payload_raw: String = row.get(2)?;
            let created_at: i64 = row.get(3)?;

            let payload = serde_json::from_str(&payload_raw).map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    2,
                    "payload".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;

            Ok(StoredEvent {
                round_id: round_id as u64,
                kind,
                payload,
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
            })
        };

        let mut events = Vec::new();
        match round_id {
            Some(id) => {
                let rows = stmt.query_map(params![id as i64], map_row)?;
                for event in rows {
                    events.push(event?);
                }
            }
            None => {
                let rows = stmt.query_map([], map_row)?;
                for event in rows {
                    events.push(event?);
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(&dir.path().join("events.db")).await.unwrap());
        let log = EventLog::new(storage);

        log.append(1, "committed", &serde_json::json!({"seed_block": 102}))
            .await
            .unwrap();
        log.append(2, "committed", &serde_json::json!({"seed_block": 105}))
            .await
            .unwrap();
        log.append(1, "revealed", &serde_json::json!({"used_extended_history": false}))
            .await
            .unwrap();

        let round_one = log.load_for_round(1).await.unwrap();
        assert_eq!(round_one.len(), 2);
        assert_eq!(round_one[0].kind, "committed");
        assert_eq!(round_one[1].kind, "revealed");
        assert_eq!(round_one[0].payload["seed_block"], 102);

        assert_eq!(log.load_all().await.unwrap().len(), 3);
    }
}
