use crate::delay::{clamp_delay, DelayPolicy};
use crate::derive;
use crate::error::{EngineError, Result};
use crate::events::{
    CommittedEvent, EventSink, ExpiredEvent, RevealedEvent, SeedEvent, TracingSink,
};
use blockseed_core::chain::ChainSource;
use blockseed_core::error::BlockseedError;
use blockseed_core::oracle::HashOracle;
use blockseed_core::storage::RoundStore;
use blockseed_core::types::{ChainId, Height, RoundId, RoundRecord, Seed};
use std::sync::Arc;
use uuid::Uuid;

/// Composite view over a round's lifecycle position.
///
/// `Revealed` and `Expired` are terminal; everything else moves forward with
/// the chain tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Uncommitted,
    Pending { blocks_until_ready: u64 },
    Ready { blocks_remaining: u64 },
    Revealed,
    Expired,
}

/// Commit-reveal randomness engine.
///
/// A round commits to a future block height, waits for it to pass, and lets
/// any keeper capture that block's hash into a verifiable seed. Once both
/// history windows roll past the target the round expires for good and
/// downstream logic runs its refund path.
pub struct SeedEngine {
    engine_id: Uuid,
    chain: Arc<dyn ChainSource>,
    oracle: HashOracle,
    store: Arc<dyn RoundStore>,
    delay: Box<dyn DelayPolicy>,
    sink: Arc<dyn EventSink>,
}

impl SeedEngine {
    pub fn new(
        engine_id: Uuid,
        chain: Arc<dyn ChainSource>,
        store: Arc<dyn RoundStore>,
        delay: Box<dyn DelayPolicy>,
    ) -> Self {
        let oracle = HashOracle::new(chain.clone());
        Self {
            engine_id,
            chain,
            oracle,
            store,
            delay,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn engine_id(&self) -> Uuid {
        self.engine_id
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain.chain_id()
    }

    /// Blocks after the target height during which reveal stays possible.
    pub fn effective_window(&self) -> u64 {
        self.oracle.effective_window()
    }

    /// Commit a round to a future block height.
    ///
    /// The policy delay is clamped so the target is always at least one
    /// block ahead, keeping its hash unknown at commit time.
    pub async fn commit(&self, round_id: RoundId) -> Result<RoundRecord> {
        if round_id == 0 {
            return Err(EngineError::InvalidRoundId);
        }
        if self.store.get(round_id).await?.is_some() {
            return Err(EngineError::SeedAlreadyCommitted(round_id));
        }

        let tip = self.chain.tip_height().await?;
        let delay = clamp_delay(self.delay.commit_delay());
        let seed_block = tip + delay;

        let record = RoundRecord::committed(round_id, tip, seed_block);
        match self.store.insert(&record).await {
            Ok(()) => {}
            Err(BlockseedError::DuplicateRound(_)) => {
                return Err(EngineError::SeedAlreadyCommitted(round_id))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            "Round {} committed at height {} targeting block {}",
            round_id,
            tip,
            seed_block
        );

        self.emit(SeedEvent::Committed(CommittedEvent {
            round_id,
            seed_block,
            deadline: seed_block + self.oracle.effective_window(),
        }))
        .await;

        Ok(record)
    }

    /// Capture the target block's hash and derive the round seed.
    ///
    /// Idempotent: an already-revealed round returns its cached seed, so
    /// competing keeper calls are harmless. Permissionless by design - the
    /// caller needs no relationship to the committer.
    pub async fn reveal(&self, round_id: RoundId) -> Result<Seed> {
        let mut record = self
            .store
            .get(round_id)
            .await?
            .ok_or(EngineError::SeedNotCommitted(round_id))?;

        if record.revealed {
            return Ok(record.seed);
        }

        let tip = self.chain.tip_height().await?;
        if tip <= record.seed_block {
            return Err(EngineError::SeedNotReady {
                round_id,
                seed_block: record.seed_block,
                current_height: tip,
            });
        }

        let lookup = match self.oracle.hash_with_fallback(record.seed_block).await? {
            Some(lookup) => lookup,
            None => {
                self.emit(SeedEvent::Expired(ExpiredEvent {
                    round_id,
                    seed_block: record.seed_block,
                    detected_at: tip,
                }))
                .await;
                return Err(EngineError::SeedExpired {
                    round_id,
                    seed_block: record.seed_block,
                });
            }
        };

        let seed = derive::derive_seed(
            &lookup.hash,
            round_id,
            &self.engine_id,
            self.chain.chain_id(),
        );

        record.block_hash = lookup.hash;
        record.seed = seed;
        record.used_extended_history = lookup.from_archive;
        record.revealed = true;
        self.store.update(&record).await?;

        tracing::info!(
            "Round {} revealed at height {} from block {}",
            round_id,
            tip,
            record.seed_block
        );

        self.emit(SeedEvent::Revealed(RevealedEvent {
            round_id,
            block_hash: lookup.hash,
            seed,
            used_extended_history: lookup.from_archive,
        }))
        .await;

        Ok(seed)
    }

    pub async fn is_committed(&self, round_id: RoundId) -> Result<bool> {
        Ok(self.store.get(round_id).await?.is_some())
    }

    pub async fn is_revealed(&self, round_id: RoundId) -> Result<bool> {
        Ok(self
            .store
            .get(round_id)
            .await?
            .map(|r| r.revealed)
            .unwrap_or(false))
    }

    /// Target height passed and still within the retrievability window.
    pub async fn is_ready(&self, round_id: RoundId) -> Result<bool> {
        let record = self.require(round_id).await?;
        let tip = self.chain.tip_height().await?;
        Ok(tip > record.seed_block && tip - record.seed_block <= self.effective_window())
    }

    /// Window exhausted with no reveal: the round is void for good.
    pub async fn is_expired(&self, round_id: RoundId) -> Result<bool> {
        let record = self.require(round_id).await?;
        let tip = self.chain.tip_height().await?;
        Ok(!record.revealed && tip > record.seed_block + self.effective_window())
    }

    /// Blocks left before expiry, or blocks until reveal opens if the
    /// target height has not passed yet. Zero once revealed or expired.
    pub async fn remaining_reveal_window(&self, round_id: RoundId) -> Result<u64> {
        let record = self.require(round_id).await?;
        if record.revealed {
            return Ok(0);
        }

        let tip = self.chain.tip_height().await?;
        let deadline = record.seed_block + self.effective_window();
        if tip <= record.seed_block {
            Ok(record.seed_block + 1 - tip)
        } else if tip <= deadline {
            Ok(deadline - tip)
        } else {
            Ok(0)
        }
    }

    pub async fn seed_block(&self, round_id: RoundId) -> Result<Height> {
        Ok(self.require(round_id).await?.seed_block)
    }

    /// The revealed seed. Fails until `reveal` has succeeded.
    pub async fn seed(&self, round_id: RoundId) -> Result<Seed> {
        let record = self.require(round_id).await?;
        if !record.revealed {
            return Err(EngineError::SeedNotRevealed(round_id));
        }
        Ok(record.seed)
    }

    /// Reveal on demand: cached seed when available, otherwise a full
    /// reveal attempt with its usual errors.
    pub async fn seed_or_reveal(&self, round_id: RoundId) -> Result<Seed> {
        self.reveal(round_id).await
    }

    /// Stored record snapshot, if the round was ever committed.
    pub async fn record(&self, round_id: RoundId) -> Result<Option<RoundRecord>> {
        Ok(self.store.get(round_id).await?)
    }

    pub async fn rounds(&self) -> Result<Vec<RoundRecord>> {
        Ok(self.store.list().await?)
    }

    pub async fn status(&self, round_id: RoundId) -> Result<RoundStatus> {
        let record = match self.store.get(round_id).await? {
            Some(record) => record,
            None => return Ok(RoundStatus::Uncommitted),
        };
        if record.revealed {
            return Ok(RoundStatus::Revealed);
        }

        let tip = self.chain.tip_height().await?;
        let deadline = record.seed_block + self.effective_window();
        if tip <= record.seed_block {
            Ok(RoundStatus::Pending {
                blocks_until_ready: record.seed_block + 1 - tip,
            })
        } else if tip <= deadline {
            Ok(RoundStatus::Ready {
                blocks_remaining: deadline - tip,
            })
        } else {
            Ok(RoundStatus::Expired)
        }
    }

    async fn require(&self, round_id: RoundId) -> Result<RoundRecord> {
        self.store
            .get(round_id)
            .await?
            .ok_or(EngineError::SeedNotCommitted(round_id))
    }

    async fn emit(&self, event: SeedEvent) {
        if let Err(e) = self.sink.emit(&event).await {
            tracing::warn!(
                "Failed to emit {} event for round {}: {}",
                event.kind(),
                event.round_id(),
                e
            );
        }
    }
}
