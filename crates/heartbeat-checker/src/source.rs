//! The blockchain data the heartbeat check depends on.

use async_trait::async_trait;
use heartbeat_core::{FetchError, Hotspot};

/// Read-only access to hotspot listings and activity heights.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// All hotspots owned by `wallet`.
    async fn wallet_hotspots(&self, wallet: &str) -> Result<Vec<Hotspot>, FetchError>;

    /// Current network height.
    async fn chain_height(&self) -> Result<u64, FetchError>;

    /// Height of the hotspot's most recent activity, `None` if it has none.
    async fn latest_activity_height(&self, hotspot: &Hotspot) -> Result<Option<u64>, FetchError>;
}
