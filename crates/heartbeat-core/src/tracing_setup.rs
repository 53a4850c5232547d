//! Logging for the one-shot heartbeat jobs.

use tracing_subscriber::EnvFilter;

/// Our crates at `info`, dependencies (reqwest, hyper) only at `warn`.
const DEFAULT_FILTER: &str =
    "warn,heartbeat=info,heartbeat_core=info,heartbeat_checker=info,heartbeat_plotter=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global stderr subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
