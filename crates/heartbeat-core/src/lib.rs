//! Heartbeat Core - shared types, persistence and notification logic for the
//! hotspot heartbeat monitor.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod notification;
pub mod notifier;
pub mod store;
pub mod tracing_setup;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, FetchError, HeartbeatError, NotifyError, StoreError};
pub use evaluator::{evaluate, Evaluation, HotspotEvaluation};
pub use history::HistoryLog;
pub use notification::{Notification, NotificationEvent, NotificationKind};
pub use notifier::{Notifier, PushoverNotifier};
pub use store::{JsonFileStore, MemoryStateStore, StateStore};
pub use types::{ChartReport, Hotspot, HotspotStatus, StalenessRecord, WalletState};
