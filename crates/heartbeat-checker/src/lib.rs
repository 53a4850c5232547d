//! Heartbeat Checker - hotspot activity checks against the Helium API.
//!
//! Lists the wallet's hotspots, looks up each hotspot's latest activity in a
//! bounded fan-out, classifies it against the staleness threshold, records
//! the outcome and sends Pushover alerts/reports.

use heartbeat_core::{Config, HeartbeatError, HistoryLog, JsonFileStore, PushoverNotifier};
use tracing::{error, info};

pub mod check;
pub mod fetch;
pub mod helium;
pub mod latency;
pub mod source;

pub use check::{HeartbeatCheck, RunSummary};
pub use helium::HeliumClient;
pub use source::ChainSource;

/// Run one heartbeat check with the production collaborators.
pub async fn run(config: &Config) -> Result<RunSummary, HeartbeatError> {
    info!("Starting heartbeat check...");

    let source = HeliumClient::new(&config.api)?;
    let store = JsonFileStore::new(&config.data_dir);
    let history = HistoryLog::new(&config.data_dir, &config.wallet);
    let notifier = PushoverNotifier::new(config.notify.clone(), config.api.timeout())?;

    let check = HeartbeatCheck {
        config,
        source: &source,
        store: &store,
        history: &history,
        notifier: &notifier,
    };

    match check.execute().await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            error!("Heartbeat check failed: {}", e);
            Err(e)
        }
    }
}
