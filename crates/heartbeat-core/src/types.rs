//! Common types used across the heartbeat services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Whether a hotspot has recorded activity recently enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotspotStatus {
    Active,
    Inactive,
}

impl fmt::Display for HotspotStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HotspotStatus::Active => write!(f, "active"),
            HotspotStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// A hotspot owned by the configured wallet, as listed by the blockchain API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub address: String,
    pub name: String,
    /// Block height the API last synced this hotspot at.
    #[serde(default)]
    pub block: Option<u64>,
    /// First advertised listen address, e.g. `/ip4/1.2.3.4/tcp/44158`.
    #[serde(default)]
    pub listen_addr: Option<String>,
}

impl Hotspot {
    pub fn new(address: &str, name: &str) -> Self {
        Self {
            address: address.to_string(),
            name: name.to_string(),
            block: None,
            listen_addr: None,
        }
    }
}

/// Current network height, valid only for the run that fetched it.
#[derive(Debug, Clone, Copy)]
pub struct ChainSnapshot {
    pub height: u64,
    pub fetched_at: DateTime<Utc>,
}

impl ChainSnapshot {
    pub fn now(height: u64) -> Self {
        Self {
            height,
            fetched_at: Utc::now(),
        }
    }
}

/// TCP connect latency to a hotspot, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyStats {
    pub avg_ms: Option<f64>,
    pub median_ms: Option<f64>,
    pub stdev_ms: Option<f64>,
}

/// Last known state of one hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredHotspot {
    pub name: String,
    pub status: HotspotStatus,
    pub last_activity_height: u64,
    pub staleness: u64,
    pub observed_at: DateTime<Utc>,
}

/// Everything persisted between runs for one wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletState {
    pub wallet: String,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hotspots: BTreeMap<String, StoredHotspot>,
    /// Last chart notification sent by the plotter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chart: Option<ChartReport>,
}

/// What the plotter last reported, used to pace chart notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartReport {
    /// Sorted `name:status` summary of every charted hotspot.
    pub wallet_status: String,
    pub reported_at: DateTime<Utc>,
}

impl WalletState {
    pub fn new(wallet: &str) -> Self {
        Self {
            wallet: wallet.to_string(),
            run_count: 0,
            last_run: None,
            hotspots: BTreeMap::new(),
            last_chart: None,
        }
    }

    pub fn previous_status(&self, address: &str) -> Option<HotspotStatus> {
        self.hotspots.get(address).map(|h| h.status)
    }
}

/// One staleness observation, appended to the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StalenessRecord {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub address: String,
    pub name: String,
    pub activity_height: u64,
    pub staleness: u64,
    pub status: HotspotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyStats>,
}
