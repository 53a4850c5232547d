//! Heartbeat - Helium hotspot staleness monitor.
//!
//! One-shot binary meant to be run from a scheduler. Each invocation runs the
//! selected roles once, in order: the activity check, then the chart plotter.

use clap::Parser;
use heartbeat_core::Config;
use std::collections::HashSet;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "heartbeat")]
#[command(version)]
#[command(about = "Helium hotspot heartbeat monitor", long_about = None)]
struct Cli {
    /// Comma-separated list of roles to run: check, plot, or all
    /// Examples: --roles check  |  --roles plot  |  --roles check,plot
    #[arg(long, default_value = "check")]
    roles: String,
}

const VALID_ROLES: &[&str] = &["check", "plot", "all"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    heartbeat_core::tracing_setup::init();

    let cli = Cli::parse();

    let mut roles: HashSet<String> = cli
        .roles
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    for role in &roles {
        if !VALID_ROLES.contains(&role.as_str()) {
            eprintln!("Unknown role: {}", role);
            eprintln!("Valid roles: check, plot, all");
            std::process::exit(1);
        }
    }

    if roles.remove("all") {
        roles.insert("check".to_string());
        roles.insert("plot".to_string());
    }

    if roles.is_empty() {
        eprintln!("No roles specified");
        std::process::exit(1);
    }

    let config = Config::from_env()?;
    info!(wallet = %config.wallet, "Starting heartbeat with roles: {:?}", roles);

    let mut failed = false;

    if roles.contains("check") {
        match heartbeat_checker::run(&config).await {
            Ok(summary) => info!(
                run = summary.run_count,
                evaluated = summary.evaluated,
                skipped = summary.skipped,
                changed = summary.changed,
                "Heartbeat check completed"
            ),
            Err(e) => {
                error!("Heartbeat check error: {}", e);
                failed = true;
            }
        }
    }

    if roles.contains("plot") {
        match heartbeat_plotter::run(&config).await {
            Ok(Some(summary)) => info!(
                hotspots = summary.hotspots,
                trigger = ?summary.trigger,
                notified = summary.notified,
                "Chart written to {}",
                summary.chart_path.display()
            ),
            Ok(None) => info!("Plotter completed without a chart"),
            Err(e) => {
                error!("Plotter error: {}", e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
