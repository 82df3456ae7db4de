//! Error types for Steward.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

/// Top-level error type for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Health check error: {0}")]
    Health(#[from] HealthCheckError),

    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Context store errors.
///
/// `NotFound` and `Corrupted` are always surfaced to the caller: the store
/// never fabricates a missing or unparseable record.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Workflow {id} not found")]
    NotFound { id: Uuid },

    #[error("Record for workflow {id} is corrupted: {reason}")]
    Corrupted { id: Uuid, reason: String },

    #[error("Workflow {id} cannot transition from {from} to {to}")]
    InvalidTransition { id: Uuid, from: String, to: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// An individual health probe failed unexpectedly.
///
/// Never escapes [`HealthMonitor::run_all`](crate::health::HealthMonitor::run_all);
/// the monitor folds it into an `unhealthy` result for that check.
#[derive(Debug, thiserror::Error)]
pub enum HealthCheckError {
    #[error("Check {name} failed: {reason}")]
    Failed { name: String, reason: String },

    #[error("Check {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Agent invocation errors, raised by the primary or fallback path.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("{path} invocation of agent {agent} failed: {reason}")]
    Failed {
        path: String,
        agent: String,
        reason: String,
    },

    #[error("Agent {agent} timed out after {timeout:?} on the {path} path")]
    Timeout {
        path: String,
        agent: String,
        timeout: Duration,
    },

    #[error("SDK unavailable: {reason}")]
    SdkUnavailable { reason: String },

    #[error("API key missing for the {path} path")]
    ApiKeyMissing { path: String },

    #[error("Resource exhausted: {reason}")]
    ResourceExhausted { reason: String },

    #[error("Network unreachable: {reason}")]
    NetworkUnreachable { reason: String },

    #[error("Context error for workflow {id}: {reason}")]
    Context { id: Uuid, reason: String },
}

/// Fallback router errors.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Both the primary and the fallback path failed for one invocation
    /// request. Terminal for that request; carries the fallback failure.
    #[error("Both primary and fallback paths failed for agent {agent}: {source}")]
    FailedBoth {
        agent: String,
        #[source]
        source: InvocationError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display() {
        let id = Uuid::new_v4();
        let err = StorageError::NotFound { id };
        let msg = err.to_string();
        assert!(
            msg.contains(&id.to_string()),
            "Should mention the workflow id: {msg}"
        );

        let err = StorageError::Corrupted {
            id,
            reason: "unexpected end of file".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("unexpected end of file"));

        let err = StorageError::InvalidTransition {
            id,
            from: "completed".to_string(),
            to: "running".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("completed"), "Should mention source state: {msg}");
        assert!(msg.contains("running"), "Should mention target state: {msg}");
    }

    #[test]
    fn invocation_error_display() {
        let err = InvocationError::Failed {
            path: "sdk".to_string(),
            agent: "planner".to_string(),
            reason: "exit code 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("planner"), "Should mention the agent: {msg}");
        assert!(msg.contains("exit code 1"), "Should mention the reason: {msg}");

        let err = InvocationError::Timeout {
            path: "prompt".to_string(),
            agent: "writer".to_string(),
            timeout: Duration::from_secs(30),
        };
        let msg = err.to_string();
        assert!(msg.contains("writer"));
        assert!(msg.contains("prompt"));
    }

    #[test]
    fn router_error_carries_fallback_failure() {
        let err = RouterError::FailedBoth {
            agent: "planner".to_string(),
            source: InvocationError::SdkUnavailable {
                reason: "binary not on PATH".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("planner"));
        assert!(msg.contains("binary not on PATH"));
    }

    #[test]
    fn top_level_error_from_conversions() {
        let storage_err = StorageError::NotFound { id: Uuid::new_v4() };
        let err: Error = storage_err.into();
        assert!(matches!(err, Error::Storage(_)));

        let health_err = HealthCheckError::Failed {
            name: "network".to_string(),
            reason: "probe refused".to_string(),
        };
        let err: Error = health_err.into();
        assert!(matches!(err, Error::Health(_)));

        let config_err = ConfigError::MissingEnvVar("STEWARD_DATA_DIR".to_string());
        let err: Error = config_err.into();
        assert!(matches!(err, Error::Config(_)));
    }
}
