//! System health and diagnostics CLI command.
//!
//! Runs the standard health check registry and prints one line per probe
//! plus the aggregate verdict and a workflow summary.

use crate::config::Config;
use crate::context::ContextStore;
use crate::health::HealthMonitor;

/// Run the status command, printing system health info.
pub async fn run_status_command() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    println!("Steward Status");
    println!("==============\n");

    println!(
        "  Version:     {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    println!("  Data dir:    {}", config.storage.data_dir.display());
    println!("  SDK binary:  {}", config.sdk.binary);
    println!();

    let monitor = HealthMonitor::from_config(&config);
    let health = monitor.run_all().await;

    println!("  Checks:");
    for (name, result) in &health.results {
        println!("    {:<12} {:<10} {}", name, result.status.to_string(), result.message);
    }
    println!("\n  Overall:     {}", health.overall);

    match ContextStore::open(&config.storage.data_dir) {
        Ok(store) => {
            let summary = store.summary()?;
            println!(
                "\n  Workflows:   {} total ({} pending, {} running, {} completed, {} failed)",
                summary.total, summary.pending, summary.running, summary.completed, summary.failed
            );
        }
        Err(e) => {
            println!("\n  Workflows:   store unavailable ({e})");
        }
    }

    Ok(())
}
