//! Bounded fan-out of per-hotspot activity lookups.

use crate::latency::{self, ProbeOptions};
use crate::source::ChainSource;
use futures::stream::{self, StreamExt};
use heartbeat_core::types::LatencyStats;
use heartbeat_core::{FetchError, Hotspot};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub max_concurrent: usize,
    pub timeout: Duration,
    /// Extra attempts after the first failure.
    pub retries: usize,
    pub probe: Option<ProbeOptions>,
}

/// What was learned about one hotspot this run.
#[derive(Debug, Clone)]
pub struct ActivityResult {
    pub hotspot: Hotspot,
    /// Latest activity height, or why it could not be determined.
    pub activity: Result<u64, String>,
    pub latency: Option<LatencyStats>,
}

/// Look up the latest activity height of every hotspot, at most
/// `max_concurrent` at a time. One hotspot failing never affects the others.
/// Results come back sorted by hotspot name.
pub async fn fetch_activity(
    source: &dyn ChainSource,
    hotspots: Vec<Hotspot>,
    options: &FetchOptions,
) -> Vec<ActivityResult> {
    let mut results: Vec<ActivityResult> = stream::iter(hotspots)
        .map(|hotspot| fetch_one(source, hotspot, options))
        .buffer_unordered(options.max_concurrent.max(1))
        .collect()
        .await;

    results.sort_by(|a, b| {
        a.hotspot
            .name
            .cmp(&b.hotspot.name)
            .then_with(|| a.hotspot.address.cmp(&b.hotspot.address))
    });
    results
}

async fn fetch_one(
    source: &dyn ChainSource,
    hotspot: Hotspot,
    options: &FetchOptions,
) -> ActivityResult {
    let probe = async {
        match (&options.probe, &hotspot.listen_addr) {
            (Some(probe_options), Some(addr)) => Some(latency::probe(addr, probe_options).await),
            _ => None,
        }
    };
    let (activity, latency) = tokio::join!(activity_with_retry(source, &hotspot, options), probe);

    ActivityResult {
        hotspot,
        activity,
        latency,
    }
}

async fn activity_with_retry(
    source: &dyn ChainSource,
    hotspot: &Hotspot,
    options: &FetchOptions,
) -> Result<u64, String> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match tokio::time::timeout(
            options.timeout,
            source.latest_activity_height(hotspot),
        )
        .await
        {
            Ok(Ok(Some(height))) => {
                debug!(hotspot = %hotspot.name, height, "Fetched latest activity");
                return Ok(height);
            }
            Ok(Ok(None)) => return Err("no activity recorded".to_string()),
            Ok(Err(e)) => e,
            Err(_) => FetchError::Timeout(options.timeout.as_secs()),
        };

        if attempt > options.retries {
            return Err(error.to_string());
        }
        warn!(
            hotspot = %hotspot.name,
            attempt,
            %error,
            "Activity fetch failed, retrying"
        );
    }
}
