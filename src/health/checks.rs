//! Concrete health probes.
//!
//! Checks are stateless and side-effect-free beyond the resource they probe.
//! Each performs its own I/O (PATH scan, file probe, outbound connect) and
//! reports through the shared [`HealthCheckResult`] shape; the monitor, not
//! the check, enforces the per-check timeout.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::HealthCheckError;
use crate::health::{HealthCheckResult, HealthStatus};

/// Check names, shared with the router's gating logic.
pub(crate) const SDK_CHECK: &str = "sdk";
pub(crate) const API_KEY_CHECK: &str = "api_key";
pub(crate) const AGENT_FILES_CHECK: &str = "agent_files";
pub(crate) const STORAGE_CHECK: &str = "storage";
pub(crate) const DISK_SPACE_CHECK: &str = "disk_space";
pub(crate) const NETWORK_CHECK: &str = "network";

/// A single named probe.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Stable identifier of this probe.
    fn name(&self) -> &str;

    /// Run the probe once. An `Err` is folded into an unhealthy result by
    /// the monitor rather than propagated.
    async fn check(&self) -> Result<HealthCheckResult, HealthCheckError>;
}

/// SDK binary availability: the configured binary must be on PATH.
pub struct SdkCheck {
    binary: String,
}

impl SdkCheck {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl HealthCheck for SdkCheck {
    fn name(&self) -> &str {
        SDK_CHECK
    }

    async fn check(&self) -> Result<HealthCheckResult, HealthCheckError> {
        let found = std::env::var_os("PATH")
            .map(|paths| {
                std::env::split_paths(&paths).any(|dir| dir.join(&self.binary).is_file())
            })
            .unwrap_or(false);

        let result = if found {
            HealthCheckResult::new(
                self.name(),
                HealthStatus::Healthy,
                format!("{} found on PATH", self.binary),
            )
        } else {
            HealthCheckResult::new(
                self.name(),
                HealthStatus::Unhealthy,
                format!("{} not found on PATH", self.binary),
            )
        };
        Ok(result)
    }
}

/// API key presence for the SDK-backed path.
///
/// Holds only whether a key is configured, never the key itself.
pub struct ApiKeyCheck {
    configured: bool,
}

impl ApiKeyCheck {
    pub fn new(configured: bool) -> Self {
        Self { configured }
    }
}

#[async_trait]
impl HealthCheck for ApiKeyCheck {
    fn name(&self) -> &str {
        API_KEY_CHECK
    }

    async fn check(&self) -> Result<HealthCheckResult, HealthCheckError> {
        let result = if self.configured {
            HealthCheckResult::new(self.name(), HealthStatus::Healthy, "API key configured")
        } else {
            HealthCheckResult::new(self.name(), HealthStatus::Unhealthy, "API key not configured")
        };
        Ok(result)
    }
}

/// Agent definition files: the agents directory must exist and hold at least
/// one file. An existing-but-empty directory is degraded, not unhealthy,
/// since prompt-based agents can still run.
pub struct AgentFilesCheck {
    dir: PathBuf,
}

impl AgentFilesCheck {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl HealthCheck for AgentFilesCheck {
    fn name(&self) -> &str {
        AGENT_FILES_CHECK
    }

    async fn check(&self) -> Result<HealthCheckResult, HealthCheckError> {
        if !self.dir.is_dir() {
            return Ok(HealthCheckResult::new(
                self.name(),
                HealthStatus::Unhealthy,
                format!("agents directory missing: {}", self.dir.display()),
            ));
        }

        let count = std::fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .count();

        let result = if count > 0 {
            HealthCheckResult::new(
                self.name(),
                HealthStatus::Healthy,
                format!("{count} agent definition(s) in {}", self.dir.display()),
            )
        } else {
            HealthCheckResult::new(
                self.name(),
                HealthStatus::Degraded,
                format!("no agent definitions in {}", self.dir.display()),
            )
        };
        Ok(result)
    }
}

/// Context storage writability: create the directory if needed and write a
/// probe file into it.
pub struct StorageCheck {
    dir: PathBuf,
}

impl StorageCheck {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl HealthCheck for StorageCheck {
    fn name(&self) -> &str {
        STORAGE_CHECK
    }

    async fn check(&self) -> Result<HealthCheckResult, HealthCheckError> {
        let probe = self.dir.join(".healthcheck");

        let attempt = std::fs::create_dir_all(&self.dir)
            .and_then(|()| std::fs::write(&probe, b"ok"))
            .and_then(|()| std::fs::remove_file(&probe));

        let result = match attempt {
            Ok(()) => HealthCheckResult::new(
                self.name(),
                HealthStatus::Healthy,
                format!("{} is writable", self.dir.display()),
            ),
            Err(e) => HealthCheckResult::new(
                self.name(),
                HealthStatus::Unhealthy,
                format!("{} is not writable: {e}", self.dir.display()),
            ),
        };
        Ok(result)
    }
}

/// Disk headroom for the storage volume.
pub struct DiskSpaceCheck {
    path: PathBuf,
    min_free_bytes: u64,
}

impl DiskSpaceCheck {
    pub fn new(path: impl Into<PathBuf>, min_free_bytes: u64) -> Self {
        Self {
            path: path.into(),
            min_free_bytes,
        }
    }
}

#[async_trait]
impl HealthCheck for DiskSpaceCheck {
    fn name(&self) -> &str {
        DISK_SPACE_CHECK
    }

    async fn check(&self) -> Result<HealthCheckResult, HealthCheckError> {
        let available = fs4::available_space(&self.path)?;

        let result = if available < self.min_free_bytes {
            HealthCheckResult::new(
                self.name(),
                HealthStatus::Unhealthy,
                format!(
                    "only {available} bytes free on {}, minimum is {}",
                    self.path.display(),
                    self.min_free_bytes
                ),
            )
        } else if available < self.min_free_bytes.saturating_mul(2) {
            HealthCheckResult::new(
                self.name(),
                HealthStatus::Degraded,
                format!("{available} bytes free on {}", self.path.display()),
            )
        } else {
            HealthCheckResult::new(
                self.name(),
                HealthStatus::Healthy,
                format!("{available} bytes free on {}", self.path.display()),
            )
        };
        Ok(result)
    }
}

/// Network reachability: a bounded TCP connect to the configured probe
/// address.
pub struct NetworkCheck {
    addr: String,
    timeout: Duration,
}

impl NetworkCheck {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl HealthCheck for NetworkCheck {
    fn name(&self) -> &str {
        NETWORK_CHECK
    }

    async fn check(&self) -> Result<HealthCheckResult, HealthCheckError> {
        let connect = tokio::net::TcpStream::connect(&self.addr);
        let result = match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => HealthCheckResult::new(
                self.name(),
                HealthStatus::Healthy,
                format!("{} reachable", self.addr),
            ),
            Ok(Err(e)) => HealthCheckResult::new(
                self.name(),
                HealthStatus::Unhealthy,
                format!("{} unreachable: {e}", self.addr),
            ),
            Err(_) => HealthCheckResult::new(
                self.name(),
                HealthStatus::Unhealthy,
                format!("{} unreachable: connect timed out after {:?}", self.addr, self.timeout),
            ),
        };
        Ok(result)
    }
}

/// Build the standard registry from configuration.
pub fn standard_checks(config: &Config) -> Vec<std::sync::Arc<dyn HealthCheck>> {
    use std::sync::Arc;

    vec![
        Arc::new(SdkCheck::new(config.sdk.binary.clone())),
        Arc::new(ApiKeyCheck::new(config.sdk.has_api_key())),
        Arc::new(AgentFilesCheck::new(config.sdk.agents_dir.clone())),
        Arc::new(StorageCheck::new(config.storage.data_dir.clone())),
        Arc::new(DiskSpaceCheck::new(
            config.storage.data_dir.clone(),
            config.health.min_disk_bytes,
        )),
        Arc::new(NetworkCheck::new(
            config.health.probe_addr.clone(),
            config.health.check_timeout,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn api_key_check_reports_presence() {
        let result = ApiKeyCheck::new(true).check().await.unwrap();
        assert_eq!(result.status, HealthStatus::Healthy);

        let result = ApiKeyCheck::new(false).check().await.unwrap();
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert_eq!(result.check_name, "api_key");
    }

    #[tokio::test]
    async fn storage_check_healthy_for_writable_dir() {
        let dir = tempdir().unwrap();
        let result = StorageCheck::new(dir.path()).check().await.unwrap();
        assert_eq!(result.status, HealthStatus::Healthy);
        // Probe file is removed afterwards
        assert!(!dir.path().join(".healthcheck").exists());
    }

    #[tokio::test]
    async fn agent_files_check_distinguishes_missing_and_empty() {
        let dir = tempdir().unwrap();

        let missing = AgentFilesCheck::new(dir.path().join("nope"));
        assert_eq!(
            missing.check().await.unwrap().status,
            HealthStatus::Unhealthy
        );

        let empty = AgentFilesCheck::new(dir.path());
        assert_eq!(empty.check().await.unwrap().status, HealthStatus::Degraded);

        std::fs::write(dir.path().join("planner.md"), "You are a planner.").unwrap();
        let populated = AgentFilesCheck::new(dir.path());
        assert_eq!(
            populated.check().await.unwrap().status,
            HealthStatus::Healthy
        );
    }

    #[tokio::test]
    async fn sdk_check_unhealthy_for_unknown_binary() {
        let check = SdkCheck::new("definitely-not-a-real-binary-name");
        let result = check.check().await.unwrap();
        assert_eq!(result.status, HealthStatus::Unhealthy);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn network_check_unhealthy_for_unroutable_addr() {
        // TEST-NET-1 address, refused or timed out either way.
        let check = NetworkCheck::new("192.0.2.1:9", Duration::from_millis(200));
        let result = check.check().await.unwrap();
        assert_eq!(result.status, HealthStatus::Unhealthy);
    }
}
