use crate::chain::ChainSource;
use crate::error::Result;
use crate::types::{BlockHash, ChainId, Height};
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// In-memory simulated chain for tests and the demo CLI.
///
/// Blocks are hash-chained from a genesis derived from the chain id. Lookups
/// enforce the same retention rules a live deployment would: a hash is
/// retrievable only while the target height is behind the tip and inside the
/// window.
pub struct SimChain {
    blocks: RwLock<Vec<BlockHash>>,
    chain_id: ChainId,
    native_window: u64,
    archive_window: Option<u64>,
}

impl SimChain {
    pub fn new(chain_id: ChainId, native_window: u64, archive_window: Option<u64>) -> Self {
        let genesis = genesis_hash(chain_id);
        Self {
            blocks: RwLock::new(vec![genesis]),
            chain_id,
            native_window,
            archive_window,
        }
    }

    /// Seal the next block with a fresh random nonce mixed over the previous
    /// hash. Returns the new tip height.
    pub fn mine(&self) -> Height {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        self.mine_with_nonce(&nonce)
    }

    /// Seal `n` blocks. Returns the resulting tip height.
    pub fn mine_many(&self, n: u64) -> Height {
        let mut tip = self.tip();
        for _ in 0..n {
            tip = self.mine();
        }
        tip
    }

    /// Seal the next block with a caller-chosen hash. Test hook for
    /// scenarios that need a known hash at a known height.
    pub fn mine_sealed(&self, hash: BlockHash) -> Height {
        let mut blocks = self.blocks.write();
        blocks.push(hash);
        (blocks.len() - 1) as Height
    }

    /// Mine until the tip reaches `height`.
    pub fn mine_to(&self, height: Height) -> Height {
        let mut tip = self.tip();
        while tip < height {
            tip = self.mine();
        }
        tip
    }

    pub fn tip(&self) -> Height {
        (self.blocks.read().len() - 1) as Height
    }

    fn mine_with_nonce(&self, nonce: &[u8]) -> Height {
        let mut blocks = self.blocks.write();
        let height = blocks.len() as Height;
        let prev = blocks[blocks.len() - 1];

        let mut hasher = Sha256::new();
        hasher.update(prev.as_bytes());
        hasher.update(height.to_be_bytes());
        hasher.update(nonce);
        blocks.push(BlockHash::new(hasher.finalize().into()));

        height
    }

    fn hash_in_window(&self, height: Height, window: u64) -> Option<BlockHash> {
        let blocks = self.blocks.read();
        let tip = (blocks.len() - 1) as Height;
        if height >= tip || tip - height > window {
            return None;
        }
        Some(blocks[height as usize])
    }

    /// Snapshot for persistence across CLI invocations.
    pub fn state(&self) -> SimChainState {
        SimChainState {
            chain_id: self.chain_id,
            native_window: self.native_window,
            archive_window: self.archive_window,
            blocks: self.blocks.read().clone(),
        }
    }

    pub fn from_state(state: SimChainState) -> Result<Self> {
        if state.blocks.is_empty() {
            return Err(crate::error::BlockseedError::chain(
                "chain state has no genesis block",
            ));
        }
        Ok(Self {
            blocks: RwLock::new(state.blocks),
            chain_id: state.chain_id,
            native_window: state.native_window,
            archive_window: state.archive_window,
        })
    }
}

#[async_trait]
impl ChainSource for SimChain {
    async fn tip_height(&self) -> Result<Height> {
        Ok(self.tip())
    }

    async fn recent_hash(&self, height: Height) -> Result<Option<BlockHash>> {
        Ok(self.hash_in_window(height, self.native_window))
    }

    async fn archive_hash(&self, height: Height) -> Result<Option<BlockHash>> {
        match self.archive_window {
            Some(window) => Ok(self.hash_in_window(height, window)),
            None => Ok(None),
        }
    }

    fn native_window(&self) -> u64 {
        self.native_window
    }

    fn archive_window(&self) -> Option<u64> {
        self.archive_window
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id
    }
}

/// Serializable chain snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimChainState {
    pub chain_id: ChainId,
    pub native_window: u64,
    pub archive_window: Option<u64>,
    pub blocks: Vec<BlockHash>,
}

fn genesis_hash(chain_id: ChainId) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(b"blockseed-sim-genesis");
    hasher.update(chain_id.to_be_bytes());
    BlockHash::new(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mining_advances_tip() {
        let chain = SimChain::new(1, 256, None);
        assert_eq!(chain.tip(), 0);
        chain.mine_many(5);
        assert_eq!(chain.tip_height().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_native_window_bounds() {
        let chain = SimChain::new(1, 4, None);
        chain.mine_many(10); // tip = 10

        // inside window: tip - h <= 4, h < tip
        assert!(chain.recent_hash(6).await.unwrap().is_some());
        assert!(chain.recent_hash(9).await.unwrap().is_some());
        // boundary: tip - 5 = 5 > window
        assert!(chain.recent_hash(5).await.unwrap().is_none());
        // tip itself is never retrievable
        assert!(chain.recent_hash(10).await.unwrap().is_none());
        assert!(chain.recent_hash(11).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archive_absent_on_unsupported_chain() {
        let chain = SimChain::new(1, 4, None);
        chain.mine_many(10);
        assert!(chain.archive_hash(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archive_covers_past_native_window() {
        let chain = SimChain::new(1, 4, Some(100));
        chain.mine_many(20); // tip = 20

        assert!(chain.recent_hash(10).await.unwrap().is_none());
        assert!(chain.archive_hash(10).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sealed_hash_is_served() {
        let chain = SimChain::new(1, 256, None);
        let hash = BlockHash::new([0xab; 32]);
        let height = chain.mine_sealed(hash);
        chain.mine();
        assert_eq!(chain.recent_hash(height).await.unwrap(), Some(hash));
    }

    #[test]
    fn test_state_round_trip() {
        let chain = SimChain::new(9, 8, Some(64));
        chain.mine_many(3);
        let state = chain.state();

        let restored = SimChain::from_state(state).unwrap();
        assert_eq!(restored.tip(), 3);
        assert_eq!(restored.chain_id(), 9);
        assert_eq!(restored.archive_window(), Some(64));
    }

    #[test]
    fn test_genesis_differs_per_chain() {
        let a = SimChain::new(1, 256, None);
        let b = SimChain::new(2, 256, None);
        assert_ne!(a.state().blocks[0], b.state().blocks[0]);
    }
}
