//! Commit-Reveal Randomness Engine
//!
//! Rounds commit to a future block height, wait for it to pass, and let any
//! keeper reveal that block's hash into a verifiable per-round seed. When
//! the native hash window has rolled over, reveal falls back to the extended
//! history log; when both windows lapse the round expires permanently and
//! the caller runs its refund path.

pub mod delay;
pub mod derive;
pub mod engine;
pub mod error;
pub mod events;

pub use delay::{DelayPolicy, FixedDelay, MAX_COMMIT_DELAY, MIN_COMMIT_DELAY};
pub use derive::{derive_seed, seed_to_bool, seed_to_range, seed_to_range_inclusive, sub_seed};
pub use engine::{RoundStatus, SeedEngine};
pub use error::{EngineError, Result};
pub use events::{
    CommittedEvent, EventSink, ExpiredEvent, MemorySink, PersistentSink, RevealedEvent, SeedEvent,
    TracingSink,
};

#[cfg(test)]
mod tests {
    use super::*;
    use blockseed_core::{MemoryRoundStore, SimChain};
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_engine_round_trip() {
        let chain = Arc::new(SimChain::new(1, 256, Some(8191)));
        chain.mine_to(10);

        let engine = SeedEngine::new(
            Uuid::new_v4(),
            chain.clone(),
            Arc::new(MemoryRoundStore::new()),
            Box::new(FixedDelay(2)),
        );

        engine.commit(1).await.unwrap();
        chain.mine_to(15);
        let seed = engine.reveal(1).await.unwrap();
        assert!(!seed.is_zero());
        assert!(seed_to_range(&seed, 10) < 10);
    }
}
