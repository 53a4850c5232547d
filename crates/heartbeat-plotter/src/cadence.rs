//! When the chart goes out.
//!
//! The chart is resent when the previous one is older than the configured
//! number of hours, or earlier when any charted hotspot crossed the
//! threshold since it was last sent.

use crate::series::HotspotSeries;
use chrono::{DateTime, Duration, Utc};
use heartbeat_core::notification::{ALERT_TITLE, REPORT_TITLE};
use heartbeat_core::{ChartReport, HotspotStatus, NotificationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartTrigger {
    /// No chart sent yet, or the last one is older than the stale window.
    Stale,
    /// The wallet summary differs from the one last sent.
    Changed,
}

impl ChartTrigger {
    pub fn kind(self) -> NotificationKind {
        match self {
            ChartTrigger::Stale => NotificationKind::Report,
            ChartTrigger::Changed => NotificationKind::Alert,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartTrigger::Stale => REPORT_TITLE,
            ChartTrigger::Changed => ALERT_TITLE,
        }
    }
}

/// Sorted `name:status` summary of the latest sample of every series.
pub fn wallet_status(series: &[HotspotSeries], threshold: u64) -> String {
    let mut parts: Vec<String> = series
        .iter()
        .map(|s| {
            let status = if s.latest() <= threshold {
                HotspotStatus::Active
            } else {
                HotspotStatus::Inactive
            };
            format!("{}:{}", s.name, status)
        })
        .collect();
    parts.sort();
    parts.join(",")
}

/// Staleness wins over a change so a due report is never downgraded to an
/// alert.
pub fn chart_trigger(
    previous: Option<&ChartReport>,
    wallet_status: &str,
    now: DateTime<Utc>,
    stale_hours: i64,
) -> Option<ChartTrigger> {
    let Some(previous) = previous else {
        return Some(ChartTrigger::Stale);
    };
    if previous.reported_at < now - Duration::hours(stale_hours) {
        Some(ChartTrigger::Stale)
    } else if previous.wallet_status != wallet_status {
        Some(ChartTrigger::Changed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: &str, hours_ago: i64) -> ChartReport {
        ChartReport {
            wallet_status: status.to_string(),
            reported_at: Utc::now() - Duration::hours(hours_ago),
        }
    }

    fn series(name: &str, latest: u64) -> HotspotSeries {
        HotspotSeries {
            name: name.to_string(),
            points: vec![(Utc::now(), latest)],
        }
    }

    #[test]
    fn test_wallet_status_is_sorted() {
        let status = wallet_status(&[series("b", 500), series("a", 10)], 450);
        assert_eq!(status, "a:active,b:inactive");
    }

    #[test]
    fn test_first_chart_is_a_report() {
        assert_eq!(
            chart_trigger(None, "a:active", Utc::now(), 8),
            Some(ChartTrigger::Stale)
        );
    }

    #[test]
    fn test_chart_trigger() {
        let now = Utc::now();
        let fresh = report("a:active", 1);
        let old = report("a:active", 9);

        assert_eq!(chart_trigger(Some(&fresh), "a:active", now, 8), None);
        assert_eq!(
            chart_trigger(Some(&fresh), "a:inactive", now, 8),
            Some(ChartTrigger::Changed)
        );
        assert_eq!(
            chart_trigger(Some(&old), "a:active", now, 8),
            Some(ChartTrigger::Stale)
        );
        assert_eq!(
            chart_trigger(Some(&old), "a:inactive", now, 8),
            Some(ChartTrigger::Stale)
        );
    }

    #[test]
    fn test_trigger_routing() {
        assert_eq!(ChartTrigger::Stale.kind(), NotificationKind::Report);
        assert_eq!(ChartTrigger::Stale.title(), "Timely Update");
        assert_eq!(ChartTrigger::Changed.kind(), NotificationKind::Alert);
        assert_eq!(ChartTrigger::Changed.title(), "Hotspot Status has Changed");
    }
}
