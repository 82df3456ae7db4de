//! Steward CLI entry point.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use steward::cli;

#[derive(Parser)]
#[command(name = "steward", version, about = "Workflow context store and fallback router")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run health checks and print a system report
    Status,
    /// List live workflow records
    List {
        /// Filter by status (pending|running|completed|failed)
        #[arg(long)]
        status: Option<String>,
    },
    /// Print one workflow record in full
    Show { id: Uuid },
    /// Archive one workflow record
    Archive { id: Uuid },
    /// Archive stale non-terminal records
    Cleanup {
        /// Retention window in hours
        #[arg(long, default_value_t = 72)]
        older_than_hours: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Status => cli::status::run_status_command().await,
        Command::List { status } => cli::workflows::run_list_command(status),
        Command::Show { id } => cli::workflows::run_show_command(id),
        Command::Archive { id } => cli::workflows::run_archive_command(id),
        Command::Cleanup { older_than_hours } => {
            cli::workflows::run_cleanup_command(older_than_hours)
        }
    }
}
