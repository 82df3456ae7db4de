//! Configuration for Steward.
//!
//! Everything is loaded once at process start via [`Config::from_env`] and
//! passed by reference to the components that need it. There are no
//! import-time singletons: a missing credential is an explicit `None`, not a
//! silently absent module attribute.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Main configuration for the service.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub health: HealthConfig,
    pub router: RouterConfig,
    pub sdk: SdkConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = StorageConfig::from_env()?;
        let sdk = SdkConfig::from_env(&storage)?;

        Ok(Self {
            storage,
            health: HealthConfig::from_env()?,
            router: RouterConfig::from_env()?,
            sdk,
        })
    }
}

/// Context store configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory holding the `records/` and `archive/` namespaces.
    pub data_dir: PathBuf,
    /// Retention window used by the cleanup sweep, in hours.
    pub retention_hours: i64,
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let data_dir = optional_env("STEWARD_DATA_DIR")?
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let retention_hours = parse_optional_env("STEWARD_RETENTION_HOURS", 72)?;
        if retention_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "STEWARD_RETENTION_HOURS".to_string(),
                message: "must be a positive number of hours".to_string(),
            });
        }

        Ok(Self {
            data_dir,
            retention_hours,
        })
    }
}

/// Default data directory: `~/.steward`.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".steward")
}

/// Health monitor configuration.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Upper bound for a single probe; a slower check is reported unhealthy.
    pub check_timeout: Duration,
    /// `host:port` probed by the network reachability check.
    pub probe_addr: String,
    /// Minimum free disk space below which the disk check degrades.
    pub min_disk_bytes: u64,
}

impl HealthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let check_timeout_secs: u64 = parse_optional_env("STEWARD_CHECK_TIMEOUT_SECS", 5)?;
        let probe_addr = optional_env("STEWARD_PROBE_ADDR")?
            .unwrap_or_else(|| "1.1.1.1:443".to_string());

        if !probe_addr.contains(':') {
            return Err(ConfigError::InvalidValue {
                key: "STEWARD_PROBE_ADDR".to_string(),
                message: "must be host:port".to_string(),
            });
        }

        Ok(Self {
            check_timeout: Duration::from_secs(check_timeout_secs),
            probe_addr,
            min_disk_bytes: parse_optional_env("STEWARD_MIN_DISK_BYTES", 100 * 1024 * 1024)?,
        })
    }
}

/// Fallback router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Upper bound for a single agent invocation on either path.
    pub invoke_timeout: Duration,
}

impl RouterConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let invoke_timeout_secs: u64 = parse_optional_env("STEWARD_INVOKE_TIMEOUT_SECS", 120)?;
        Ok(Self {
            invoke_timeout: Duration::from_secs(invoke_timeout_secs),
        })
    }
}

/// SDK invocation path configuration.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Name of the SDK binary expected on PATH.
    pub binary: String,
    /// API key for the SDK-backed path, if configured.
    pub api_key: Option<SecretString>,
    /// Directory holding agent definition files.
    pub agents_dir: PathBuf,
}

impl SdkConfig {
    fn from_env(storage: &StorageConfig) -> Result<Self, ConfigError> {
        let binary = optional_env("STEWARD_SDK_BIN")?.unwrap_or_else(|| "claude".to_string());
        let api_key = optional_env("STEWARD_API_KEY")?.map(SecretString::from);
        let agents_dir = optional_env("STEWARD_AGENTS_DIR")?
            .map(PathBuf::from)
            .unwrap_or_else(|| storage.data_dir.join("agents"));

        Ok(Self {
            binary,
            api_key,
            agents_dir,
        })
    }

    /// Whether an API key is configured for the SDK path.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

// Helper functions

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}
