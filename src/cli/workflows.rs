//! Workflow record CLI commands: list, show, archive, cleanup.

use anyhow::Context as _;
use chrono::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::context::{ContextStore, WorkflowStatus};
use crate::error::StorageError;

fn open_store() -> anyhow::Result<ContextStore> {
    let config = Config::from_env()?;
    Ok(ContextStore::open(&config.storage.data_dir)?)
}

/// List live workflow records, optionally filtered by status.
pub fn run_list_command(status: Option<String>) -> anyhow::Result<()> {
    let filter = status
        .map(|s| s.parse::<WorkflowStatus>().map_err(anyhow::Error::msg))
        .transpose()?;

    let store = open_store()?;
    let mut summaries: Vec<_> = store.list(filter)?.collect();
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    if summaries.is_empty() {
        println!("No workflow records.");
        return Ok(());
    }

    println!("{:<38} {:<10} {:<22} TASK", "WORKFLOW", "STATUS", "UPDATED");
    for s in summaries {
        println!(
            "{:<38} {:<10} {:<22} {}",
            s.workflow_id,
            s.status.to_string(),
            s.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            s.task
        );
    }
    Ok(())
}

/// Print one record in full, including its execution log.
pub fn run_show_command(id: Uuid) -> anyhow::Result<()> {
    let store = open_store()?;

    // Fall back to the archive namespace for retired workflows.
    let record = match store.load(id) {
        Ok(record) => record,
        Err(StorageError::NotFound { .. }) => store
            .load_archived(id)
            .with_context(|| format!("workflow {id} not found in records or archive"))?,
        Err(e) => return Err(e.into()),
    };

    println!("Workflow:  {}", record.workflow_id);
    println!("Task:      {}", record.task);
    println!("Status:    {}", record.status);
    println!("Created:   {}", record.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Updated:   {}", record.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    if !record.agents_completed.is_empty() {
        println!("Agents:    {}", record.agents_completed.join(", "));
    }

    if !record.state.is_empty() {
        println!("\nState:");
        println!("{}", serde_json::to_string_pretty(&record.state)?);
    }

    if !record.execution_log.is_empty() {
        println!("\nExecution log:");
        for entry in &record.execution_log {
            println!(
                "  {}  {:<20} {:<18} {}",
                entry.at.format("%H:%M:%S"),
                entry.agent,
                entry.outcome.to_string(),
                entry.detail
            );
        }
    }
    Ok(())
}

/// Archive one workflow record.
pub fn run_archive_command(id: Uuid) -> anyhow::Result<()> {
    let store = open_store()?;
    store.archive(id)?;
    println!("Archived workflow {id}");
    Ok(())
}

/// Archive stale non-terminal records older than the given window.
pub fn run_cleanup_command(older_than_hours: i64) -> anyhow::Result<()> {
    anyhow::ensure!(older_than_hours > 0, "--older-than-hours must be positive");

    let store = open_store()?;
    let archived = store.cleanup(Duration::hours(older_than_hours))?;
    println!("Archived {archived} stale workflow(s) older than {older_than_hours}h");
    Ok(())
}
