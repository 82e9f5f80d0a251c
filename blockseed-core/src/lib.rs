//! Blockseed SDK - Core library for chain access and historical hash lookups
//!
//! This library provides the platform layer under the commit-reveal engine:
//! a read-only chain abstraction, the dual-window historical hash oracle,
//! and persistent round/event storage.

pub mod chain;
pub mod error;
pub mod oracle;
pub mod storage;
pub mod types;

pub use chain::{ChainSource, SimChain, SimChainState};
pub use error::{BlockseedError, Result};
pub use oracle::{HashLookup, HashOracle};
pub use storage::{EventLog, MemoryRoundStore, RoundStore, SqliteRoundStore, Storage};
pub use types::{BlockHash, ChainId, Height, RoundId, RoundRecord, Seed};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_oracle_over_sim_chain() {
        let chain = Arc::new(SimChain::new(1, 256, Some(8191)));
        chain.mine_many(3);

        let oracle = HashOracle::new(chain);
        assert_eq!(oracle.effective_window(), 8191);
        assert!(oracle.hash_with_fallback(2).await.unwrap().is_some());
    }
}
