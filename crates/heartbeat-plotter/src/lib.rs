//! Heartbeat Plotter - staleness chart job.
//!
//! Reads the staleness history written by the checker, renders the last few
//! days per hotspot into an SVG chart and posts it when the wallet's status
//! changed or the previous chart has gone stale.

use chrono::Utc;
use heartbeat_core::notification::Attachment;
use heartbeat_core::store::wallet_dir;
use heartbeat_core::{
    ChartReport, Config, HistoryLog, JsonFileStore, Notification, Notifier, NotifyError,
    PushoverNotifier, StateStore, StoreError,
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub mod cadence;
pub mod render;
pub mod series;

pub use cadence::{chart_trigger, wallet_status, ChartTrigger};
pub use render::render_svg;
pub use series::{build_series, rolling_median, HotspotSeries};

const CHART_TITLE: &str = "Inactive Block Chart";
const CHART_DIR: &str = "charts";
const CHART_FILE: &str = "heartbeats.svg";

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("chart I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

#[derive(Debug, Clone)]
pub struct PlotSummary {
    pub chart_path: PathBuf,
    pub hotspots: usize,
    pub within_threshold: usize,
    /// Why the chart was sent; `None` when nothing was due.
    pub trigger: Option<ChartTrigger>,
    pub notified: bool,
}

/// One plotting run: history in, chart file and notification out.
pub struct PlotJob<'a> {
    pub config: &'a Config,
    pub history: &'a HistoryLog,
    pub store: &'a dyn StateStore,
    pub notifier: &'a dyn Notifier,
}

impl PlotJob<'_> {
    /// Returns `Ok(None)` when there is no history to plot yet.
    pub async fn execute(&self) -> Result<Option<PlotSummary>, PlotError> {
        let days_back = self.config.plot.days_back;
        let records = self.history.load_window(days_back).await?;
        let series = build_series(&records, days_back);
        if series.is_empty() {
            warn!("No staleness history in {}, nothing to plot", self.history.dir().display());
            return Ok(None);
        }

        let threshold = self.config.check.staleness_threshold;
        let svg = render_svg(&series, threshold)?;

        let dir = wallet_dir(&self.config.data_dir, &self.config.wallet).join(CHART_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        let chart_path = dir.join(CHART_FILE);
        tokio::fs::write(&chart_path, svg.as_bytes()).await?;
        info!(hotspots = series.len(), "Wrote chart to {}", chart_path.display());

        let within_threshold = series.iter().filter(|s| s.latest() <= threshold).count();
        let status = wallet_status(&series, threshold);
        let now = Utc::now();

        let mut state = self.store.load(&self.config.wallet).await?;
        let trigger = chart_trigger(
            state.last_chart.as_ref(),
            &status,
            now,
            self.config.plot.report_stale_hours,
        );

        let mut notified = false;
        match trigger {
            None => debug!(%status, "Chart unchanged and recent, not sending"),
            Some(trigger) => {
                let message = format!(
                    "{} previous {} days\n{}/{} hotspots within threshold",
                    CHART_TITLE,
                    days_back,
                    within_threshold,
                    series.len()
                );
                let notification = Notification::new(trigger.kind(), trigger.title(), message)
                    .with_attachment(Attachment {
                        file_name: CHART_FILE.to_string(),
                        mime_type: "image/svg+xml".to_string(),
                        bytes: svg.into_bytes(),
                    });

                match self.notifier.send(&notification).await {
                    Ok(()) => {
                        notified = true;
                        // Only a delivered chart resets the cadence.
                        state.last_chart = Some(ChartReport {
                            wallet_status: status,
                            reported_at: now,
                        });
                        self.store.save(&self.config.wallet, &state).await?;
                    }
                    Err(e) => error!(?trigger, "Failed to send chart notification: {}", e),
                }
            }
        }

        Ok(Some(PlotSummary {
            chart_path,
            hotspots: series.len(),
            within_threshold,
            trigger,
            notified,
        }))
    }
}

/// Render the chart and send it, if due, with the production collaborators.
pub async fn run(config: &Config) -> Result<Option<PlotSummary>, PlotError> {
    info!("Starting chart plotter...");

    let history = HistoryLog::new(&config.data_dir, &config.wallet);
    let store = JsonFileStore::new(&config.data_dir);
    let notifier = PushoverNotifier::new(config.notify.clone(), config.api.timeout())?;

    PlotJob {
        config,
        history: &history,
        store: &store,
        notifier: &notifier,
    }
    .execute()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use heartbeat_core::{
        HotspotStatus, MemoryStateStore, NotificationKind, StalenessRecord, WalletState,
    };
    use std::sync::Mutex;
    use tempfile::TempDir;
    use uuid::Uuid;

    const WALLET: &str = "wallet1";

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail {
                return Err(NotifyError::Rejected {
                    status: 500,
                    body: "down".to_string(),
                });
            }
            Ok(())
        }
    }

    fn config(dir: &TempDir) -> Config {
        let data_dir = dir.path().to_string_lossy().to_string();
        Config::from_lookup(|key| match key {
            "WALLET_ADDR" => Some(WALLET.to_string()),
            "HEARTBEAT_DATA_DIR" => Some(data_dir.clone()),
            "PUSHOVER_USER_TOKEN" => Some("user".to_string()),
            "PUSHOVER_APP_TOKEN_HNT_REPORT" => Some("report".to_string()),
            "STALENESS_THRESHOLD" => Some("20".to_string()),
            "REPORT_STALE_HOURS" => Some("8".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn record(name: &str, staleness: u64, minutes_ago: i64) -> StalenessRecord {
        StalenessRecord {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            address: format!("addr-{name}"),
            name: name.to_string(),
            activity_height: 100,
            staleness,
            status: if staleness <= 20 {
                HotspotStatus::Active
            } else {
                HotspotStatus::Inactive
            },
            latency: None,
        }
    }

    fn state_with_chart(wallet_status: &str, hours_ago: i64) -> WalletState {
        let mut state = WalletState::new(WALLET);
        state.last_chart = Some(ChartReport {
            wallet_status: wallet_status.to_string(),
            reported_at: Utc::now() - Duration::hours(hours_ago),
        });
        state
    }

    struct Fixture {
        _dir: TempDir,
        config: Config,
        history: HistoryLog,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let history = HistoryLog::new(&config.data_dir, WALLET);
        history
            .append(&[
                record("alpha", 5, 30),
                record("beta", 10, 30),
                record("alpha", 8, 20),
                record("beta", 60, 20),
            ])
            .await
            .unwrap();
        Fixture {
            _dir: dir,
            config,
            history,
        }
    }

    async fn plot(
        fixture: &Fixture,
        store: &MemoryStateStore,
        notifier: &RecordingNotifier,
    ) -> PlotSummary {
        PlotJob {
            config: &fixture.config,
            history: &fixture.history,
            store,
            notifier,
        }
        .execute()
        .await
        .unwrap()
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_chart_is_sent_as_report() {
        let fixture = fixture().await;
        let store = MemoryStateStore::new();
        let notifier = RecordingNotifier::default();

        let summary = plot(&fixture, &store, &notifier).await;

        assert_eq!(summary.hotspots, 2);
        assert_eq!(summary.within_threshold, 1);
        assert_eq!(summary.trigger, Some(ChartTrigger::Stale));
        assert!(summary.notified);
        let svg = std::fs::read_to_string(&summary.chart_path).unwrap();
        assert!(svg.contains("alpha"));

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Report);
        assert_eq!(sent[0].title, "Timely Update");
        assert!(sent[0].message.contains("1/2 hotspots within threshold"));
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.mime_type, "image/svg+xml");

        let chart = store.snapshot(WALLET).await.unwrap().last_chart.unwrap();
        assert_eq!(chart.wallet_status, "alpha:active,beta:inactive");
    }

    #[tokio::test]
    async fn test_recent_unchanged_chart_is_not_resent() {
        let fixture = fixture().await;
        let before = state_with_chart("alpha:active,beta:inactive", 1);
        let store = MemoryStateStore::with_state(before.clone()).await;
        let notifier = RecordingNotifier::default();

        let summary = plot(&fixture, &store, &notifier).await;

        assert_eq!(summary.trigger, None);
        assert!(!summary.notified);
        assert!(summary.chart_path.exists());
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(store.snapshot(WALLET).await, Some(before));
    }

    #[tokio::test]
    async fn test_status_change_is_sent_as_alert() {
        let fixture = fixture().await;
        let store = MemoryStateStore::with_state(state_with_chart(
            "alpha:active,beta:active",
            1,
        ))
        .await;
        let notifier = RecordingNotifier::default();

        let summary = plot(&fixture, &store, &notifier).await;

        assert_eq!(summary.trigger, Some(ChartTrigger::Changed));
        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Alert);
        assert_eq!(sent[0].title, "Hotspot Status has Changed");

        let chart = store.snapshot(WALLET).await.unwrap().last_chart.unwrap();
        assert_eq!(chart.wallet_status, "alpha:active,beta:inactive");
    }

    #[tokio::test]
    async fn test_stale_chart_is_resent_as_report() {
        let fixture = fixture().await;
        let store = MemoryStateStore::with_state(state_with_chart(
            "alpha:active,beta:inactive",
            9,
        ))
        .await;
        let notifier = RecordingNotifier::default();

        let summary = plot(&fixture, &store, &notifier).await;

        assert_eq!(summary.trigger, Some(ChartTrigger::Stale));
        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Report);

        let chart = store.snapshot(WALLET).await.unwrap().last_chart.unwrap();
        assert!(chart.reported_at > Utc::now() - Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_plot_without_history_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let history = HistoryLog::new(&config.data_dir, WALLET);
        let store = MemoryStateStore::new();
        let notifier = RecordingNotifier::default();

        let summary = PlotJob {
            config: &config,
            history: &history,
            store: &store,
            notifier: &notifier,
        }
        .execute()
        .await
        .unwrap();

        assert!(summary.is_none());
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert!(store.snapshot(WALLET).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_send_keeps_chart_and_retries_next_run() {
        let fixture = fixture().await;
        let store = MemoryStateStore::new();
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };

        let summary = plot(&fixture, &store, &notifier).await;

        assert_eq!(summary.trigger, Some(ChartTrigger::Stale));
        assert!(!summary.notified);
        assert!(summary.chart_path.exists());
        assert!(store.snapshot(WALLET).await.is_none());
    }
}
