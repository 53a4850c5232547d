//! Deciding which notifications a run produces, and rendering them.

use crate::evaluator::HotspotEvaluation;
use crate::types::HotspotStatus;
use std::fmt::Write as _;

pub const ALERT_TITLE: &str = "Hotspot Status has Changed";
pub const REPORT_TITLE: &str = "Timely Update";

/// Which Pushover application a notification goes out through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Report,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub address: String,
    pub name: String,
    pub previous: HotspotStatus,
    pub current: HotspotStatus,
    pub staleness: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub address: String,
    pub name: String,
    pub staleness: u64,
    pub status: HotspotStatus,
}

/// A notification decided on during evaluation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// Only the hotspots whose status flipped this run.
    Alert { changes: Vec<StatusChange> },
    /// Every evaluated hotspot, plus how many could not be evaluated.
    Report {
        entries: Vec<ReportEntry>,
        skipped: usize,
    },
}

/// Binary payload sent along with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A rendered notification, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Whether run number `run_count` (1-based) is due a report.
pub fn report_due(run_count: u64, report_every_n_runs: u64) -> bool {
    run_count % report_every_n_runs.max(1) == 0
}

/// Build this run's notifications: an Alert when any hotspot changed status,
/// and a Report when the cadence says one is due. The two are independent.
pub fn plan_notifications(
    evaluations: &[HotspotEvaluation],
    skipped: usize,
    run_count: u64,
    report_every_n_runs: u64,
) -> Vec<NotificationEvent> {
    let mut sorted: Vec<&HotspotEvaluation> = evaluations.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.address.cmp(&b.address)));

    let mut events = Vec::new();

    let changes: Vec<StatusChange> = sorted
        .iter()
        .filter(|e| e.evaluation.changed)
        .filter_map(|e| {
            e.previous.map(|previous| StatusChange {
                address: e.address.clone(),
                name: e.name.clone(),
                previous,
                current: e.evaluation.status,
                staleness: e.evaluation.staleness,
            })
        })
        .collect();
    if !changes.is_empty() {
        events.push(NotificationEvent::Alert { changes });
    }

    if report_due(run_count, report_every_n_runs) {
        let entries = sorted
            .iter()
            .map(|e| ReportEntry {
                address: e.address.clone(),
                name: e.name.clone(),
                staleness: e.evaluation.staleness,
                status: e.evaluation.status,
            })
            .collect();
        events.push(NotificationEvent::Report { entries, skipped });
    }

    events
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::Alert { .. } => NotificationKind::Alert,
            NotificationEvent::Report { .. } => NotificationKind::Report,
        }
    }

    pub fn render(&self) -> Notification {
        match self {
            NotificationEvent::Alert { changes } => {
                let mut message = String::new();
                for change in changes {
                    let _ = writeln!(
                        message,
                        "{}: {} -> {} ({} blocks)",
                        change.name, change.previous, change.current, change.staleness
                    );
                }
                Notification::new(
                    NotificationKind::Alert,
                    ALERT_TITLE,
                    message.trim_end().to_string(),
                )
            }
            NotificationEvent::Report { entries, skipped } => {
                let active = entries
                    .iter()
                    .filter(|e| e.status == HotspotStatus::Active)
                    .count();
                let mut message = format!("{}/{} hotspots active\n", active, entries.len());
                for entry in entries {
                    let _ = writeln!(
                        message,
                        "[{}] {} ({})",
                        entry.staleness, entry.name, entry.status
                    );
                }
                if *skipped > 0 {
                    let _ = writeln!(message, "{} hotspot(s) could not be checked", skipped);
                }
                Notification::new(
                    NotificationKind::Report,
                    REPORT_TITLE,
                    message.trim_end().to_string(),
                )
            }
        }
    }
}
