//! Turning the staleness history into per-hotspot time series.

use chrono::{DateTime, Duration, Utc};
use heartbeat_core::StalenessRecord;
use std::collections::BTreeMap;

/// Staleness samples for one hotspot, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotSeries {
    pub name: String,
    pub points: Vec<(DateTime<Utc>, u64)>,
}

impl HotspotSeries {
    pub fn latest(&self) -> u64 {
        self.points.last().map(|(_, s)| *s).unwrap_or(0)
    }

    pub fn max(&self) -> u64 {
        self.points.iter().map(|(_, s)| *s).max().unwrap_or(0)
    }

    pub fn values(&self) -> Vec<u64> {
        self.points.iter().map(|(_, s)| *s).collect()
    }
}

/// Group records by hotspot name, keeping only those within `days_back` days
/// of the newest record. Series are ordered by name.
pub fn build_series(records: &[StalenessRecord], days_back: i64) -> Vec<HotspotSeries> {
    let Some(newest) = records.iter().map(|r| r.timestamp).max() else {
        return Vec::new();
    };
    let cutoff = newest - Duration::days(days_back);

    let mut grouped: BTreeMap<&str, Vec<(DateTime<Utc>, u64)>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.timestamp >= cutoff) {
        grouped
            .entry(record.name.as_str())
            .or_default()
            .push((record.timestamp, record.staleness));
    }

    grouped
        .into_iter()
        .map(|(name, mut points)| {
            points.sort_by_key(|(ts, _)| *ts);
            HotspotSeries {
                name: name.to_string(),
                points,
            }
        })
        .collect()
}

/// Median of each trailing window of `window` samples; `None` until the
/// first window fills up.
pub fn rolling_median(values: &[u64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let mut slice = values[i + 1 - window..=i].to_vec();
            slice.sort_unstable();
            let mid = slice.len() / 2;
            Some(if slice.len() % 2 == 0 {
                (slice[mid - 1] + slice[mid]) as f64 / 2.0
            } else {
                slice[mid] as f64
            })
        })
        .collect()
}
