//! Runs the check registry and aggregates verdicts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::health::checks::{self, HealthCheck};
use crate::health::{HealthCheckResult, HealthStatus};

/// Aggregated verdicts of one monitor run.
#[derive(Debug, Clone)]
pub struct AggregateHealth {
    /// Worst status among all individual results. Healthy for an empty
    /// registry.
    pub overall: HealthStatus,
    pub results: BTreeMap<String, HealthCheckResult>,
}

impl AggregateHealth {
    /// Whether the named check reported unhealthy.
    pub fn is_unhealthy(&self, check_name: &str) -> bool {
        self.results
            .get(check_name)
            .is_some_and(|r| r.status == HealthStatus::Unhealthy)
    }

    /// Diagnostic message of the named check, if it ran.
    pub fn message(&self, check_name: &str) -> Option<&str> {
        self.results.get(check_name).map(|r| r.message.as_str())
    }
}

/// Runs a fixed registry of independent checks.
pub struct HealthMonitor {
    checks: Vec<Arc<dyn HealthCheck>>,
    check_timeout: Duration,
}

impl HealthMonitor {
    /// Create a monitor with an empty registry.
    pub fn new(check_timeout: Duration) -> Self {
        Self {
            checks: Vec::new(),
            check_timeout,
        }
    }

    /// Build the standard registry from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            checks: checks::standard_checks(config),
            check_timeout: config.health.check_timeout,
        }
    }

    /// Add a check to the registry.
    pub fn register(&mut self, check: Arc<dyn HealthCheck>) -> &mut Self {
        self.checks.push(check);
        self
    }

    /// Run every registered check and aggregate the verdicts.
    ///
    /// A check that fails or exceeds the per-check timeout becomes an
    /// unhealthy result carrying the failure text; it never aborts the
    /// aggregation of the others.
    pub async fn run_all(&self) -> AggregateHealth {
        let mut results = BTreeMap::new();

        for check in &self.checks {
            let name = check.name().to_string();
            let result = match tokio::time::timeout(self.check_timeout, check.check()).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    tracing::warn!(check = %name, error = %e, "health check failed");
                    HealthCheckResult::new(&name, HealthStatus::Unhealthy, e.to_string())
                }
                Err(_) => {
                    tracing::warn!(check = %name, timeout = ?self.check_timeout, "health check timed out");
                    HealthCheckResult::new(
                        &name,
                        HealthStatus::Unhealthy,
                        format!("check timed out after {:?}", self.check_timeout),
                    )
                }
            };
            results.insert(name, result);
        }

        let overall = results
            .values()
            .map(|r| r.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        tracing::debug!(%overall, checks = results.len(), "health monitor run complete");
        AggregateHealth { overall, results }
    }
}
