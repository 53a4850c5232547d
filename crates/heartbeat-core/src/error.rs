//! Error types shared by the heartbeat services.

use thiserror::Error;

/// Configuration problems. Always fatal, raised before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),
    #[error("at least one of PUSHOVER_APP_TOKEN_HNT_REPORT or PUSHOVER_APP_TOKEN_HNT_ALERT must be set")]
    NoNotificationToken,
}

/// Errors talking to the blockchain API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Errors delivering a push notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification rejected with HTTP status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid attachment: {0}")]
    Attachment(String),
}

/// Errors reading or writing local state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Run-level error for the heartbeat check.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to fetch hotspots for wallet: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not determine chain height")]
    NoChainHeight,
}
