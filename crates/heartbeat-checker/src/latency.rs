//! TCP connect latency probe for hotspots that advertise a listen address.

use heartbeat_core::types::LatencyStats;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

pub const DEFAULT_P2P_PORT: u16 = 44158;

#[derive(Clone, Debug)]
pub struct ProbeOptions {
    pub runs: usize,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            runs: 5,
            port: DEFAULT_P2P_PORT,
            timeout: Duration::from_secs(2),
        }
    }
}

/// Split a multiaddr such as `/ip4/1.2.3.4/tcp/44158` into host and port.
pub fn parse_listen_addr(addr: &str) -> Option<(String, Option<u16>)> {
    let parts: Vec<&str> = addr.split('/').collect();
    let host = parts.get(2).filter(|h| !h.is_empty())?;
    let port = match (parts.get(3), parts.get(4)) {
        (Some(&"tcp"), Some(port)) => port.parse().ok(),
        _ => None,
    };
    Some((host.to_string(), port))
}

/// Connect `runs` times and summarize the successful connect times.
pub async fn probe(listen_addr: &str, options: &ProbeOptions) -> LatencyStats {
    let Some((host, port)) = parse_listen_addr(listen_addr) else {
        debug!(listen_addr, "Unrecognized listen address, skipping probe");
        return LatencyStats::default();
    };
    let port = port.unwrap_or(options.port);

    let mut samples = Vec::with_capacity(options.runs);
    for _ in 0..options.runs {
        let start = Instant::now();
        match tokio::time::timeout(options.timeout, TcpStream::connect((host.as_str(), port))).await
        {
            Ok(Ok(_stream)) => samples.push(start.elapsed().as_secs_f64() * 1000.0),
            Ok(Err(e)) => debug!(%host, port, %e, "Probe connect failed"),
            Err(_) => debug!(%host, port, "Probe connect timed out"),
        }
    }

    summarize(&samples)
}

/// Mean, median and sample standard deviation of `samples`.
pub fn summarize(samples: &[f64]) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats::default();
    }

    let n = samples.len() as f64;
    let avg = samples.iter().sum::<f64>() / n;

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    let stdev = if samples.len() > 1 {
        let variance = samples.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / (n - 1.0);
        Some(variance.sqrt())
    } else {
        None
    };

    LatencyStats {
        avg_ms: Some(round2(avg)),
        median_ms: Some(round2(median)),
        stdev_ms: stdev.map(round2),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
