use async_trait::async_trait;
use blockseed_core::storage::EventLog;
use blockseed_core::types::{BlockHash, Height, RoundId, Seed};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Commit record for off-chain observers: the target block and the last
/// height at which reveal will still succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedEvent {
    pub round_id: RoundId,
    pub seed_block: Height,
    pub deadline: Height,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedEvent {
    pub round_id: RoundId,
    pub block_hash: BlockHash,
    pub seed: Seed,
    pub used_extended_history: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredEvent {
    pub round_id: RoundId,
    pub seed_block: Height,
    pub detected_at: Height,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedEvent {
    Committed(CommittedEvent),
    Revealed(RevealedEvent),
    Expired(ExpiredEvent),
}

impl SeedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SeedEvent::Committed(_) => "committed",
            SeedEvent::Revealed(_) => "revealed",
            SeedEvent::Expired(_) => "expired",
        }
    }

    pub fn round_id(&self) -> RoundId {
        match self {
            SeedEvent::Committed(e) => e.round_id,
            SeedEvent::Revealed(e) => e.round_id,
            SeedEvent::Expired(e) => e.round_id,
        }
    }
}

/// Outlet for protocol events. Sink failures never propagate into protocol
/// results; the engine logs and moves on.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: &SeedEvent) -> blockseed_core::Result<()>;
}

/// Default sink: structured log lines only.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn emit(&self, event: &SeedEvent) -> blockseed_core::Result<()> {
        match event {
            SeedEvent::Committed(e) => {
                tracing::info!(
                    "Round {} committed: seed block {}, reveal deadline {}",
                    e.round_id,
                    e.seed_block,
                    e.deadline
                );
            }
            SeedEvent::Revealed(e) => {
                tracing::info!(
                    "Round {} revealed: hash {}, extended history: {}",
                    e.round_id,
                    e.block_hash,
                    e.used_extended_history
                );
            }
            SeedEvent::Expired(e) => {
                tracing::warn!(
                    "Round {} expired: seed block {} unretrievable at height {}",
                    e.round_id,
                    e.seed_block,
                    e.detected_at
                );
            }
        }
        Ok(())
    }
}

/// Buffering sink for tests and in-process indexers.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<SeedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SeedEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn emit(&self, event: &SeedEvent) -> blockseed_core::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Sink that appends each event to the sqlite audit log.
pub struct PersistentSink {
    log: EventLog,
}

impl PersistentSink {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl EventSink for PersistentSink {
    async fn emit(&self, event: &SeedEvent) -> blockseed_core::Result<()> {
        let payload = serde_json::to_value(event)?;
        self.log.append(event.round_id(), event.kind(), &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_carries_kind_tag() {
        let event = SeedEvent::Committed(CommittedEvent {
            round_id: 3,
            seed_block: 102,
            deadline: 8293,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "committed");
        assert_eq!(value["seed_block"], 102);

        let back: SeedEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[tokio::test]
    async fn test_memory_sink_buffers_in_order() {
        let sink = MemorySink::new();
        let committed = SeedEvent::Committed(CommittedEvent {
            round_id: 1,
            seed_block: 10,
            deadline: 266,
        });
        let expired = SeedEvent::Expired(ExpiredEvent {
            round_id: 1,
            seed_block: 10,
            detected_at: 400,
        });

        sink.emit(&committed).await.unwrap();
        sink.emit(&expired).await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), "committed");
        assert_eq!(events[1].kind(), "expired");
    }
}
