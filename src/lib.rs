//! Steward: workflow context persistence, health monitoring, and fallback
//! routing for agent integrations.
//!
//! The library has three cooperating pieces:
//!
//! - [`context`] — the per-workflow [`ContextRecord`] (shared blackboard,
//!   status lifecycle, append-only execution log) and the file-backed
//!   [`ContextStore`] that persists it, one JSON document per workflow.
//! - [`health`] — independent probes behind the [`health::HealthCheck`]
//!   trait, aggregated by [`health::HealthMonitor`] into one overall status.
//! - [`router`] — the [`router::FallbackRouter`], which consults the monitor,
//!   attempts the SDK-backed primary path, diverts to the prompt-based
//!   fallback when the primary is unavailable or fails, and records every
//!   decision on the owning record.
//!
//! A typical caller creates or loads a record through the store, routes an
//! invocation, then saves:
//!
//! ```no_run
//! # use std::collections::BTreeMap;
//! # async fn example(router: steward::router::FallbackRouter) -> steward::Result<()> {
//! let config = steward::Config::from_env()?;
//! let store = steward::ContextStore::open(&config.storage.data_dir)?;
//!
//! let mut record = store.create("summarize quarterly export", BTreeMap::new())?;
//! let decision = router.route("summarizer", &mut record).await?;
//! store.save(&mut record)?;
//! tracing::info!(used_fallback = decision.used_fallback, "invocation routed");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod health;
pub mod router;

pub use config::Config;
pub use context::{ContextRecord, ContextStore, WorkflowStatus};
pub use error::{Error, Result};
