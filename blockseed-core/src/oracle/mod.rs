use crate::chain::ChainSource;
use crate::error::Result;
use crate::types::{BlockHash, Height};
use async_trait::async_trait;
use std::sync::Arc;

/// One retrievability window over past block hashes.
///
/// Implementations wrap a lookup path on the chain; the oracle tries them
/// in order, cheapest first.
#[async_trait]
pub trait HistoryWindow: Send + Sync {
    async fn lookup(&self, height: Height) -> Result<Option<BlockHash>>;

    /// Number of trailing blocks this window covers.
    fn span(&self) -> u64;

    /// Whether hits from this window count as extended history.
    fn extended(&self) -> bool;
}

/// The platform's native recent-hash store.
pub struct NativeWindow {
    chain: Arc<dyn ChainSource>,
}

impl NativeWindow {
    pub fn new(chain: Arc<dyn ChainSource>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl HistoryWindow for NativeWindow {
    async fn lookup(&self, height: Height) -> Result<Option<BlockHash>> {
        self.chain.recent_hash(height).await
    }

    fn span(&self) -> u64 {
        self.chain.native_window()
    }

    fn extended(&self) -> bool {
        false
    }
}

/// The larger on-chain history log, where the platform exposes one.
pub struct ArchiveWindow {
    chain: Arc<dyn ChainSource>,
}

impl ArchiveWindow {
    pub fn new(chain: Arc<dyn ChainSource>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl HistoryWindow for ArchiveWindow {
    async fn lookup(&self, height: Height) -> Result<Option<BlockHash>> {
        self.chain.archive_hash(height).await
    }

    fn span(&self) -> u64 {
        self.chain.archive_window().unwrap_or(0)
    }

    fn extended(&self) -> bool {
        true
    }
}

/// A successful historical hash lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashLookup {
    pub hash: BlockHash,
    pub from_archive: bool,
}

/// Historical hash oracle with dual-window fallback.
///
/// Tries the native window first and falls back to the extended history log.
/// All lookups are pure reads, safe to call speculatively from queries.
pub struct HashOracle {
    windows: Vec<Box<dyn HistoryWindow>>,
}

impl HashOracle {
    /// Oracle over the chain's default lookup paths. The archive strategy is
    /// only installed when the deployment actually has an extended log.
    pub fn new(chain: Arc<dyn ChainSource>) -> Self {
        let mut windows: Vec<Box<dyn HistoryWindow>> =
            vec![Box::new(NativeWindow::new(chain.clone()))];
        if chain.archive_window().is_some() {
            windows.push(Box::new(ArchiveWindow::new(chain)));
        }
        Self { windows }
    }

    /// Custom window stack, tried in order.
    pub fn with_windows(windows: Vec<Box<dyn HistoryWindow>>) -> Self {
        Self { windows }
    }

    /// Hash for `height`, or `None` once every window has rolled past it.
    pub async fn hash_with_fallback(&self, height: Height) -> Result<Option<HashLookup>> {
        for window in &self.windows {
            if let Some(hash) = window.lookup(height).await? {
                return Ok(Some(HashLookup {
                    hash,
                    from_archive: window.extended(),
                }));
            }
        }
        Ok(None)
    }

    /// Maximum number of blocks after a target height during which reveal
    /// remains possible: the widest installed window.
    pub fn effective_window(&self) -> u64 {
        self.windows.iter().map(|w| w.span()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SimChain;

    fn oracle_over(native: u64, archive: Option<u64>, blocks: u64) -> (Arc<SimChain>, HashOracle) {
        let chain = Arc::new(SimChain::new(1, native, archive));
        chain.mine_many(blocks);
        let oracle = HashOracle::new(chain.clone());
        (chain, oracle)
    }

    #[tokio::test]
    async fn test_fresh_height_hits_native() {
        let (_, oracle) = oracle_over(4, Some(100), 10);
        let lookup = oracle.hash_with_fallback(8).await.unwrap().unwrap();
        assert!(!lookup.from_archive);
    }

    #[tokio::test]
    async fn test_stale_height_falls_back_to_archive() {
        let (_, oracle) = oracle_over(4, Some(100), 10);
        let lookup = oracle.hash_with_fallback(2).await.unwrap().unwrap();
        assert!(lookup.from_archive);
    }

    #[tokio::test]
    async fn test_both_windows_agree_on_hash() {
        let (chain, oracle) = oracle_over(4, Some(100), 10);
        let lookup = oracle.hash_with_fallback(2).await.unwrap().unwrap();
        assert_eq!(Some(lookup.hash), chain.archive_hash(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_past_every_window() {
        let (_, oracle) = oracle_over(4, Some(16), 30);
        assert!(oracle.hash_with_fallback(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_archive_means_native_only() {
        let (_, oracle) = oracle_over(4, None, 10);
        assert_eq!(oracle.effective_window(), 4);
        assert!(oracle.hash_with_fallback(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_effective_window_is_widest() {
        let (_, oracle) = oracle_over(4, Some(100), 1);
        assert_eq!(oracle.effective_window(), 100);
    }
}
