//! Health checks and aggregation.
//!
//! Each probe is an independent [`HealthCheck`]; the [`HealthMonitor`] runs
//! the whole registry and folds the verdicts into one overall status.

pub(crate) mod checks;
mod monitor;

pub use checks::{
    AgentFilesCheck, ApiKeyCheck, DiskSpaceCheck, HealthCheck, NetworkCheck, SdkCheck,
    StorageCheck,
};
pub use monitor::{AggregateHealth, HealthMonitor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict of a single probe, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        };
        write!(f, "{s}")
    }
}

/// Result of one probe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub check_name: String,
    pub status: HealthStatus,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    /// Build a result stamped with the current time.
    pub fn new(check_name: impl Into<String>, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            status,
            message: message.into(),
            checked_at: Utc::now(),
        }
    }
}
