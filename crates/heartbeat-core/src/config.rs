//! Configuration for the heartbeat services.
//!
//! Everything is read once at process start and then passed down by
//! reference. Nothing below this module touches the environment.

use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HELIUM_API_URL: &str = "https://api.helium.io";
const DEFAULT_PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_STALENESS_THRESHOLD: u64 = 450;
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ACTIVITY_MAX_PAGES: usize = 3;
const DEFAULT_PLOT_DAYS_BACK: i64 = 3;
const DEFAULT_REPORT_STALE_HOURS: i64 = 8;

/// Blockchain API settings.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub activity_max_pages: usize,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pushover credentials.
///
/// A missing report or alert token falls back to the other one, so both
/// fields are always populated once loaded.
#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub api_url: String,
    pub report_token: String,
    pub alert_token: String,
    pub user_token: String,
    pub recipient: String,
}

/// Heartbeat check settings.
#[derive(Clone, Debug)]
pub struct CheckConfig {
    pub staleness_threshold: u64,
    pub report_every_n_runs: u64,
    pub probe_latency: bool,
}

/// Chart job settings.
#[derive(Clone, Debug)]
pub struct PlotConfig {
    pub days_back: i64,
    /// Resend the chart once this many hours have passed without a change.
    pub report_stale_hours: i64,
}

/// Combined configuration for all roles.
#[derive(Clone, Debug)]
pub struct Config {
    pub wallet: String,
    pub data_dir: PathBuf,
    pub api: ApiConfig,
    pub notify: NotifyConfig,
    pub check: CheckConfig,
    pub plot: PlotConfig,
}

impl Config {
    /// Create configuration from environment variables, honoring a `.env`
    /// file if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let wallet = var("WALLET_ADDR").ok_or(ConfigError::Missing("WALLET_ADDR"))?;

        let report = var("PUSHOVER_APP_TOKEN_HNT_REPORT");
        let alert = var("PUSHOVER_APP_TOKEN_HNT_ALERT");
        let (report_token, alert_token) = match (report, alert) {
            (Some(r), Some(a)) => (r, a),
            (Some(r), None) => (r.clone(), r),
            (None, Some(a)) => (a.clone(), a),
            (None, None) => return Err(ConfigError::NoNotificationToken),
        };
        let user_token =
            var("PUSHOVER_USER_TOKEN").ok_or(ConfigError::Missing("PUSHOVER_USER_TOKEN"))?;
        let recipient = var("PUSHOVER_GROUP_TOKEN").unwrap_or_else(|| user_token.clone());

        Ok(Self {
            wallet: wallet.trim().to_string(),
            data_dir: var("HEARTBEAT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            api: ApiConfig {
                base_url: var("HELIUM_API_URL")
                    .unwrap_or_else(|| DEFAULT_HELIUM_API_URL.into())
                    .trim_end_matches('/')
                    .to_string(),
                timeout_secs: parse(var("FETCH_TIMEOUT_SECS"))
                    .filter(|n: &u64| *n > 0)
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
                max_concurrent_fetches: parse(var("MAX_CONCURRENT_FETCHES"))
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(DEFAULT_MAX_CONCURRENT_FETCHES),
                activity_max_pages: parse(var("ACTIVITY_MAX_PAGES"))
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or(DEFAULT_ACTIVITY_MAX_PAGES),
            },
            notify: NotifyConfig {
                api_url: var("PUSHOVER_API_URL").unwrap_or_else(|| DEFAULT_PUSHOVER_API_URL.into()),
                report_token,
                alert_token,
                user_token,
                recipient,
            },
            check: CheckConfig {
                staleness_threshold: parse(var("STALENESS_THRESHOLD"))
                    .unwrap_or(DEFAULT_STALENESS_THRESHOLD),
                report_every_n_runs: parse(var("REPORT_EVERY_N_RUNS")).unwrap_or(1).max(1),
                probe_latency: var("PROBE_LATENCY")
                    .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            },
            plot: PlotConfig {
                days_back: parse(var("PLOT_DAYS_BACK"))
                    .filter(|d: &i64| *d > 0)
                    .unwrap_or(DEFAULT_PLOT_DAYS_BACK),
                report_stale_hours: parse(var("REPORT_STALE_HOURS"))
                    .filter(|h: &i64| *h > 0)
                    .unwrap_or(DEFAULT_REPORT_STALE_HOURS),
            },
        })
    }
}

fn parse<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("WALLET_ADDR", "wallet1"),
            ("PUSHOVER_APP_TOKEN_HNT_REPORT", "report"),
            ("PUSHOVER_USER_TOKEN", "user"),
        ]))
        .unwrap();

        assert_eq!(config.wallet, "wallet1");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.api.base_url, "https://api.helium.io");
        assert_eq!(config.api.max_concurrent_fetches, 8);
        assert_eq!(config.check.staleness_threshold, 450);
        assert_eq!(config.check.report_every_n_runs, 1);
        assert!(!config.check.probe_latency);
        assert_eq!(config.plot.days_back, 3);
        assert_eq!(config.plot.report_stale_hours, 8);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.notify.recipient, "user");
    }

    #[test]
    fn test_missing_wallet_is_fatal() {
        let err = Config::from_lookup(lookup(&[
            ("PUSHOVER_APP_TOKEN_HNT_REPORT", "report"),
            ("PUSHOVER_USER_TOKEN", "user"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WALLET_ADDR")));
    }

    #[test]
    fn test_one_token_required() {
        let err = Config::from_lookup(lookup(&[
            ("WALLET_ADDR", "wallet1"),
            ("PUSHOVER_USER_TOKEN", "user"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoNotificationToken));

        let config = Config::from_lookup(lookup(&[
            ("WALLET_ADDR", "wallet1"),
            ("PUSHOVER_APP_TOKEN_HNT_ALERT", "alert"),
            ("PUSHOVER_USER_TOKEN", "user"),
        ]))
        .unwrap();
        assert_eq!(config.notify.report_token, "alert");
        assert_eq!(config.notify.alert_token, "alert");
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let config = Config::from_lookup(lookup(&[
            ("WALLET_ADDR", " wallet1 "),
            ("PUSHOVER_APP_TOKEN_HNT_REPORT", "report"),
            ("PUSHOVER_APP_TOKEN_HNT_ALERT", "alert"),
            ("PUSHOVER_USER_TOKEN", "user"),
            ("PUSHOVER_GROUP_TOKEN", "group"),
            ("HELIUM_API_URL", "http://localhost:1234/"),
            ("STALENESS_THRESHOLD", "20"),
            ("REPORT_EVERY_N_RUNS", "0"),
            ("MAX_CONCURRENT_FETCHES", "lots"),
            ("PROBE_LATENCY", "TRUE"),
            ("FETCH_TIMEOUT_SECS", "0"),
            ("REPORT_STALE_HOURS", "24"),
        ]))
        .unwrap();

        assert_eq!(config.wallet, "wallet1");
        assert_eq!(config.api.base_url, "http://localhost:1234");
        assert_eq!(config.check.staleness_threshold, 20);
        assert_eq!(config.check.report_every_n_runs, 1);
        assert_eq!(config.api.max_concurrent_fetches, 8);
        assert!(config.check.probe_latency);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.plot.report_stale_hours, 24);
        assert_eq!(config.notify.report_token, "report");
        assert_eq!(config.notify.alert_token, "alert");
        assert_eq!(config.notify.recipient, "group");
    }
}
