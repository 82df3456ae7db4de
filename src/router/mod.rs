//! Fallback routing: primary-vs-fallback dispatch with the decision recorded
//! on the owning context record.
//!
//! One invocation request walks a fixed state machine:
//!
//! ```text
//! Start -> Primary -> Completed
//!            |
//!            v
//!        Fallback -> Completed (used_fallback = true)
//!            |
//!            v
//!        Failed-Both (terminal, surfaced to the caller)
//! ```
//!
//! The health gate can skip `Primary` entirely: if a check relevant to the
//! SDK-backed path is already unhealthy the router goes straight to
//! `Fallback`. Each path is attempted exactly once per request; repeated
//! attempts are the caller's responsibility. Every attempted path appends
//! exactly one execution-log entry, so a postmortem never depends on
//! external log files.

mod invokers;

pub use invokers::{PromptInvoker, SdkInvoker};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::{ContextRecord, ExecutionOutcome, WorkflowStatus};
use crate::error::{InvocationError, RouterError};
use crate::health::checks::{API_KEY_CHECK, NETWORK_CHECK, SDK_CHECK, STORAGE_CHECK};
use crate::health::{AggregateHealth, HealthMonitor};

/// Why an invocation was diverted to the fallback path. `None` when no
/// fallback occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    None,
    SdkUnavailable,
    ApiKeyMissing,
    ResourceExhausted,
    NetworkUnreachable,
    ContextError,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::SdkUnavailable => "sdk_unavailable",
            Self::ApiKeyMissing => "api_key_missing",
            Self::ResourceExhausted => "resource_exhausted",
            Self::NetworkUnreachable => "network_unreachable",
            Self::ContextError => "context_error",
        };
        write!(f, "{s}")
    }
}

/// The routing outcome returned to the caller. The same information is
/// appended to the record's execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackDecision {
    pub agent_type: String,
    pub failure_reason: FailureReason,
    pub used_fallback: bool,
    pub detail: String,
}

/// One invocation path (SDK-backed primary or prompt-based fallback).
///
/// Implementations must bound their own external waits; a timeout is
/// reported as an [`InvocationError`] like any other failure.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Short name of this path, used in log entries ("sdk", "prompt").
    fn path_name(&self) -> &str;

    /// Invoke the named agent against the record. The record is the shared
    /// blackboard: implementations may read and mutate its `state`.
    async fn invoke(
        &self,
        agent: &str,
        record: &mut ContextRecord,
    ) -> Result<String, InvocationError>;
}

/// Classify an invocation failure into the reason recorded on the decision.
///
/// An unclassified primary failure is treated as the SDK being unavailable
/// for this invocation.
fn classify(err: &InvocationError) -> FailureReason {
    match err {
        InvocationError::SdkUnavailable { .. } | InvocationError::Failed { .. } => {
            FailureReason::SdkUnavailable
        }
        InvocationError::ApiKeyMissing { .. } => FailureReason::ApiKeyMissing,
        InvocationError::ResourceExhausted { .. } => FailureReason::ResourceExhausted,
        InvocationError::Timeout { .. } | InvocationError::NetworkUnreachable { .. } => {
            FailureReason::NetworkUnreachable
        }
        InvocationError::Context { .. } => FailureReason::ContextError,
    }
}

/// Map an unhealthy check relevant to the SDK-backed path to the reason that
/// blocks the primary. Checks irrelevant to the primary (disk headroom,
/// agent files) never block on their own; the attempt itself decides.
fn blocking_reason(health: &AggregateHealth) -> Option<FailureReason> {
    if health.is_unhealthy(STORAGE_CHECK) {
        return Some(FailureReason::ContextError);
    }
    if health.is_unhealthy(SDK_CHECK) {
        return Some(FailureReason::SdkUnavailable);
    }
    if health.is_unhealthy(API_KEY_CHECK) {
        return Some(FailureReason::ApiKeyMissing);
    }
    if health.is_unhealthy(NETWORK_CHECK) {
        return Some(FailureReason::NetworkUnreachable);
    }
    None
}

/// Decides the invocation path and records the decision.
pub struct FallbackRouter {
    monitor: HealthMonitor,
    primary: Arc<dyn AgentInvoker>,
    fallback: Arc<dyn AgentInvoker>,
}

impl FallbackRouter {
    pub fn new(
        monitor: HealthMonitor,
        primary: Arc<dyn AgentInvoker>,
        fallback: Arc<dyn AgentInvoker>,
    ) -> Self {
        Self {
            monitor,
            primary,
            fallback,
        }
    }

    /// Route one invocation request for `agent` against `record`.
    ///
    /// On success the record is `Completed` and `agents_completed` gains the
    /// agent name. On Failed-Both the record is `Failed` and the fallback
    /// failure is surfaced. The caller persists the record afterwards; the
    /// router only mutates it in memory.
    pub async fn route(
        &self,
        agent: &str,
        record: &mut ContextRecord,
    ) -> Result<FallbackDecision, RouterError> {
        if record.status == WorkflowStatus::Pending {
            record.transition(WorkflowStatus::Running)?;
        }

        let health = self.monitor.run_all().await;

        let reason = match blocking_reason(&health) {
            None => {
                match self.primary.invoke(agent, record).await {
                    Ok(output) => {
                        let detail = format!(
                            "{} path succeeded: {output}",
                            self.primary.path_name()
                        );
                        record.complete_agent(agent);
                        record.transition(WorkflowStatus::Completed)?;
                        record.log_entry(agent, ExecutionOutcome::Success, detail.clone());
                        tracing::info!(agent, workflow_id = %record.workflow_id, "primary invocation succeeded");
                        return Ok(FallbackDecision {
                            agent_type: agent.to_string(),
                            failure_reason: FailureReason::None,
                            used_fallback: false,
                            detail,
                        });
                    }
                    Err(err) => {
                        let reason = classify(&err);
                        tracing::warn!(
                            agent,
                            workflow_id = %record.workflow_id,
                            error = %err,
                            %reason,
                            "primary invocation failed, trying fallback path"
                        );
                        record.log_entry(
                            agent,
                            ExecutionOutcome::FallbackTriggered,
                            format!("{} path failed: {err}", self.primary.path_name()),
                        );
                        reason
                    }
                }
            }
            Some(reason) => {
                let blocked_by = health
                    .message(match reason {
                        FailureReason::ContextError => STORAGE_CHECK,
                        FailureReason::SdkUnavailable => SDK_CHECK,
                        FailureReason::ApiKeyMissing => API_KEY_CHECK,
                        _ => NETWORK_CHECK,
                    })
                    .unwrap_or("unhealthy check")
                    .to_string();
                tracing::warn!(
                    agent,
                    workflow_id = %record.workflow_id,
                    %reason,
                    blocked_by,
                    "primary path blocked by health check, using fallback"
                );
                record.log_entry(
                    agent,
                    ExecutionOutcome::FallbackTriggered,
                    format!(
                        "{} path skipped ({reason}): {blocked_by}",
                        self.primary.path_name()
                    ),
                );
                reason
            }
        };

        self.attempt_fallback(agent, record, reason).await
    }

    async fn attempt_fallback(
        &self,
        agent: &str,
        record: &mut ContextRecord,
        reason: FailureReason,
    ) -> Result<FallbackDecision, RouterError> {
        match self.fallback.invoke(agent, record).await {
            Ok(output) => {
                let detail = format!(
                    "{} path succeeded after fallback ({reason}): {output}",
                    self.fallback.path_name()
                );
                record.complete_agent(agent);
                record.transition(WorkflowStatus::Completed)?;
                record.log_entry(agent, ExecutionOutcome::Success, detail.clone());
                tracing::info!(agent, workflow_id = %record.workflow_id, %reason, "fallback invocation succeeded");
                Ok(FallbackDecision {
                    agent_type: agent.to_string(),
                    failure_reason: reason,
                    used_fallback: true,
                    detail,
                })
            }
            Err(err) => {
                record.transition(WorkflowStatus::Failed)?;
                record.log_entry(
                    agent,
                    ExecutionOutcome::Failure,
                    format!("{} path failed: {err}", self.fallback.path_name()),
                );
                tracing::error!(
                    agent,
                    workflow_id = %record.workflow_id,
                    error = %err,
                    "both invocation paths failed"
                );
                Err(RouterError::FailedBoth {
                    agent: agent.to_string(),
                    source: err,
                })
            }
        }
    }
}
