pub mod sim;

pub use sim::{SimChain, SimChainState};

use crate::error::Result;
use crate::types::{BlockHash, ChainId, Height};
use async_trait::async_trait;

/// Read-only access to the host chain's block hashes.
///
/// Two lookup paths with different retention: `recent_hash` covers the
/// platform's native window of most-recent blocks (typically 256), while
/// `archive_hash` covers the larger on-chain history log where the platform
/// exposes one (~8191 blocks). Both are pure reads and return `None` outside
/// their window, so they are safe to call speculatively from queries.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Height of the latest sealed block.
    async fn tip_height(&self) -> Result<Height>;

    /// Hash of `height` from the native recent-history store.
    async fn recent_hash(&self, height: Height) -> Result<Option<BlockHash>>;

    /// Hash of `height` from the extended history log, `None` on platforms
    /// without one.
    async fn archive_hash(&self, height: Height) -> Result<Option<BlockHash>>;

    /// Number of trailing blocks the native store retains.
    fn native_window(&self) -> u64;

    /// Number of trailing blocks the extended log retains, if it exists.
    fn archive_window(&self) -> Option<u64>;

    fn chain_id(&self) -> ChainId;
}
