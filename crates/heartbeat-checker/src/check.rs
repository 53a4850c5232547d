//! One heartbeat check run: fetch, evaluate, persist, notify.

use crate::fetch::{fetch_activity, FetchOptions};
use crate::latency::ProbeOptions;
use crate::source::ChainSource;
use chrono::Utc;
use heartbeat_core::config::Config;
use heartbeat_core::notification::plan_notifications;
use heartbeat_core::types::{ChainSnapshot, StoredHotspot, WalletState};
use heartbeat_core::{
    evaluate, HeartbeatError, HistoryLog, HotspotEvaluation, Notifier, StalenessRecord, StateStore,
};
use std::collections::HashSet;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// What a run did, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub run_count: u64,
    pub chain_height: u64,
    pub evaluated: usize,
    pub skipped: usize,
    pub changed: usize,
    pub pruned: Vec<String>,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

/// The collaborators of a heartbeat check, borrowed for one run.
pub struct HeartbeatCheck<'a> {
    pub config: &'a Config,
    pub source: &'a dyn ChainSource,
    pub store: &'a dyn StateStore,
    pub history: &'a HistoryLog,
    pub notifier: &'a dyn Notifier,
}

impl HeartbeatCheck<'_> {
    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_concurrent: self.config.api.max_concurrent_fetches,
            timeout: self.config.api.timeout(),
            retries: 1,
            probe: self.config.check.probe_latency.then(ProbeOptions::default),
        }
    }

    pub async fn execute(&self) -> Result<RunSummary, HeartbeatError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("heartbeat_check", %run_id, wallet = %self.config.wallet);
        self.execute_run(run_id).instrument(span).await
    }

    async fn execute_run(&self, run_id: Uuid) -> Result<RunSummary, HeartbeatError> {
        let wallet = self.config.wallet.as_str();
        let threshold = self.config.check.staleness_threshold;

        // A failed listing aborts the run before anything is written.
        let mut hotspots = self.source.wallet_hotspots(wallet).await?;
        let mut seen = HashSet::new();
        hotspots.retain(|h| seen.insert(h.address.clone()));
        info!(count = hotspots.len(), "Collecting heartbeats for wallet");

        let previous = self.store.load(wallet).await?;

        if hotspots.is_empty() {
            warn!("Wallet lists no hotspots, leaving stored state untouched");
            return Ok(RunSummary {
                run_id,
                run_count: previous.run_count,
                chain_height: 0,
                evaluated: 0,
                skipped: 0,
                changed: 0,
                pruned: Vec::new(),
                notifications_sent: 0,
                notifications_failed: 0,
            });
        }

        let chain = ChainSnapshot::now(match self.source.chain_height().await {
            Ok(height) => height,
            Err(e) => {
                warn!(%e, "Chain height unavailable, falling back to highest hotspot block");
                hotspots
                    .iter()
                    .filter_map(|h| h.block)
                    .max()
                    .ok_or(HeartbeatError::NoChainHeight)?
            }
        });
        let chain_height = chain.height;
        info!(chain_height, fetched_at = %chain.fetched_at, "Chain height");

        let results = fetch_activity(self.source, hotspots, &self.fetch_options()).await;

        let now = Utc::now();
        let mut next = WalletState {
            wallet: wallet.to_string(),
            run_count: previous.run_count + 1,
            last_run: Some(now),
            hotspots: Default::default(),
            last_chart: previous.last_chart.clone(),
        };
        let mut evaluations = Vec::new();
        let mut records = Vec::new();
        let mut skipped = 0;

        for result in &results {
            let hotspot = &result.hotspot;
            let activity_height = match &result.activity {
                Ok(height) => *height,
                Err(reason) => {
                    warn!(
                        hotspot = %hotspot.name,
                        %reason,
                        "No activity height, skipping this run"
                    );
                    skipped += 1;
                    if let Some(stored) = previous.hotspots.get(&hotspot.address) {
                        next.hotspots.insert(hotspot.address.clone(), stored.clone());
                    }
                    continue;
                }
            };

            let prior = previous.previous_status(&hotspot.address);
            let evaluation = evaluate(activity_height, chain_height, threshold, prior);
            info!(
                hotspot = %hotspot.name,
                activity_height,
                staleness = evaluation.staleness,
                status = %evaluation.status,
                changed = evaluation.changed,
                "Evaluated hotspot"
            );

            next.hotspots.insert(
                hotspot.address.clone(),
                StoredHotspot {
                    name: hotspot.name.clone(),
                    status: evaluation.status,
                    last_activity_height: activity_height,
                    staleness: evaluation.staleness,
                    observed_at: now,
                },
            );
            records.push(StalenessRecord {
                run_id,
                timestamp: now,
                address: hotspot.address.clone(),
                name: hotspot.name.clone(),
                activity_height,
                staleness: evaluation.staleness,
                status: evaluation.status,
                latency: result.latency,
            });
            evaluations.push(HotspotEvaluation {
                address: hotspot.address.clone(),
                name: hotspot.name.clone(),
                activity_height,
                previous: prior,
                evaluation,
            });
        }

        let pruned: Vec<String> = previous
            .hotspots
            .iter()
            .filter(|(address, _)| !results.iter().any(|r| &r.hotspot.address == *address))
            .map(|(address, stored)| {
                info!(hotspot = %stored.name, %address, "Hotspot no longer in wallet, pruning");
                address.clone()
            })
            .collect();

        self.history.append(&records).await?;
        self.store.save(wallet, &next).await?;

        // Delivery is best effort; the state above is already committed.
        let events = plan_notifications(
            &evaluations,
            skipped,
            next.run_count,
            self.config.check.report_every_n_runs,
        );
        let mut notifications_sent = 0;
        let mut notifications_failed = 0;
        for event in &events {
            let notification = event.render();
            match self.notifier.send(&notification).await {
                Ok(()) => notifications_sent += 1,
                Err(e) => {
                    error!(kind = ?notification.kind, %e, "Failed to send notification");
                    notifications_failed += 1;
                }
            }
        }

        let summary = RunSummary {
            run_id,
            run_count: next.run_count,
            chain_height,
            evaluated: evaluations.len(),
            skipped,
            changed: evaluations.iter().filter(|e| e.evaluation.changed).count(),
            pruned,
            notifications_sent,
            notifications_failed,
        };
        info!(
            evaluated = summary.evaluated,
            skipped = summary.skipped,
            changed = summary.changed,
            notifications_sent,
            "Heartbeat check complete"
        );
        Ok(summary)
    }
}
