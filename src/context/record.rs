//! The context record: one workflow's shared state.
//!
//! A [`ContextRecord`] is the blackboard a workflow's agents read and write.
//! Agents append to the execution log and mutate the `state` map; the record
//! itself enforces the status lifecycle and keeps `updated_at` fresh on every
//! mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Lifecycle status of a workflow.
///
/// Transitions are forward-only: `Pending -> Running`,
/// `Running -> Completed | Failed`, and any non-archived state `-> Archived`
/// (the cleanup sweep archives stale pending/running records too).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Archived,
}

impl WorkflowStatus {
    /// Whether the workflow has reached a terminal outcome.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Archived)
    }

    fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Pending, Self::Archived)
                | (Self::Running, Self::Archived)
                | (Self::Completed, Self::Archived)
                | (Self::Failed, Self::Archived)
        )
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Archived => "archived",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "archived" => Ok(Self::Archived),
            _ => Err(format!(
                "invalid status '{s}', expected pending|running|completed|failed|archived"
            )),
        }
    }
}

/// A typed blackboard value.
///
/// Keeps type information across the persistence round-trip instead of
/// collapsing everything to strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<StateValue>),
    Map(BTreeMap<String, StateValue>),
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for StateValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Outcome of one logged agent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    Failure,
    FallbackTriggered,
}

impl std::fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::FallbackTriggered => "fallback_triggered",
        };
        write!(f, "{s}")
    }
}

/// One append-only entry in a record's execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEntry {
    pub at: DateTime<Utc>,
    pub agent: String,
    pub outcome: ExecutionOutcome,
    pub detail: String,
}

/// One workflow's shared state.
///
/// Fields unknown to this version of the schema are preserved in `extra` and
/// re-written on save, so a newer writer's fields survive a round-trip
/// through an older reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub workflow_id: Uuid,
    pub task: String,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub state: BTreeMap<String, StateValue>,
    #[serde(default)]
    pub agents_completed: Vec<String>,
    #[serde(default)]
    pub execution_log: Vec<ExecutionEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ContextRecord {
    /// Create a new pending record with a fresh workflow id.
    pub fn new(task: impl Into<String>, initial_state: BTreeMap<String, StateValue>) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: Uuid::new_v4(),
            task: task.into(),
            status: WorkflowStatus::Pending,
            state: initial_state,
            agents_completed: Vec::new(),
            execution_log: Vec::new(),
            created_at: now,
            updated_at: now,
            extra: BTreeMap::new(),
        }
    }

    /// Read a blackboard value.
    pub fn get_state(&self, key: &str) -> Option<&StateValue> {
        self.state.get(key)
    }

    /// Write a blackboard value. Last-write-wins on an existing key.
    pub fn set_state(&mut self, key: impl Into<String>, value: impl Into<StateValue>) {
        self.state.insert(key.into(), value.into());
        self.touch();
    }

    /// Move the workflow to a new status, rejecting backward transitions.
    pub fn transition(&mut self, to: WorkflowStatus) -> Result<(), StorageError> {
        if !self.status.can_transition(to) {
            return Err(StorageError::InvalidTransition {
                id: self.workflow_id,
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        tracing::debug!(
            workflow_id = %self.workflow_id,
            from = %self.status,
            to = %to,
            "workflow status transition"
        );
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Record that an agent finished processing this workflow.
    pub fn complete_agent(&mut self, agent: impl Into<String>) {
        self.agents_completed.push(agent.into());
        self.touch();
    }

    /// Append one entry to the execution log. Entries are never reordered or
    /// rewritten.
    pub fn log_entry(
        &mut self,
        agent: impl Into<String>,
        outcome: ExecutionOutcome,
        detail: impl Into<String>,
    ) {
        self.execution_log.push(ExecutionEntry {
            at: Utc::now(),
            agent: agent.into(),
            outcome,
            detail: detail.into(),
        });
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_record_starts_pending() {
        let record = ContextRecord::new("demo", BTreeMap::new());
        assert_eq!(record.status, WorkflowStatus::Pending);
        assert!(record.agents_completed.is_empty());
        assert!(record.execution_log.is_empty());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn forward_transitions_allowed() {
        let mut record = ContextRecord::new("demo", BTreeMap::new());
        record.transition(WorkflowStatus::Running).unwrap();
        record.transition(WorkflowStatus::Completed).unwrap();
        record.transition(WorkflowStatus::Archived).unwrap();
        assert_eq!(record.status, WorkflowStatus::Archived);
    }

    #[test]
    fn backward_transitions_rejected() {
        let mut record = ContextRecord::new("demo", BTreeMap::new());
        record.transition(WorkflowStatus::Running).unwrap();
        record.transition(WorkflowStatus::Failed).unwrap();

        let err = record.transition(WorkflowStatus::Running).unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }));
        assert_eq!(record.status, WorkflowStatus::Failed);
    }

    #[test]
    fn pending_cannot_skip_to_completed() {
        let mut record = ContextRecord::new("demo", BTreeMap::new());
        let err = record.transition(WorkflowStatus::Completed).unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }));
    }

    #[test]
    fn stale_pending_can_be_archived() {
        let mut record = ContextRecord::new("demo", BTreeMap::new());
        record.transition(WorkflowStatus::Archived).unwrap();
        assert_eq!(record.status, WorkflowStatus::Archived);
    }

    #[test]
    fn set_state_is_last_write_wins() {
        let mut record = ContextRecord::new("demo", BTreeMap::new());
        record.set_state("phase", "draft");
        record.set_state("phase", "final");
        assert_eq!(
            record.get_state("phase"),
            Some(&StateValue::String("final".to_string()))
        );
    }

    #[test]
    fn mutations_refresh_updated_at() {
        let mut record = ContextRecord::new("demo", BTreeMap::new());
        let before = record.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        record.set_state("k", 1i64);
        assert!(record.updated_at > before);

        let before = record.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        record.log_entry("planner", ExecutionOutcome::Success, "done");
        assert!(record.updated_at > before);
    }

    #[test]
    fn state_values_round_trip_with_types() {
        let mut nested = BTreeMap::new();
        nested.insert("inner".to_string(), StateValue::Int(7));

        let mut record = ContextRecord::new("demo", BTreeMap::new());
        record.set_state("flag", true);
        record.set_state("count", 42i64);
        record.set_state("ratio", StateValue::Float(0.5));
        record.set_state("name", "steward");
        record.set_state(
            "items",
            StateValue::List(vec![StateValue::Int(1), StateValue::String("two".into())]),
        );
        record.set_state("nested", StateValue::Map(nested));
        record.set_state("nothing", StateValue::Null);

        let json = serde_json::to_string(&record).unwrap();
        let loaded: ContextRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.get_state("count"), Some(&StateValue::Int(42)));
        assert_eq!(loaded.get_state("nothing"), Some(&StateValue::Null));
    }

    #[test]
    fn unknown_fields_preserved() {
        let mut record = ContextRecord::new("demo", BTreeMap::new());
        record.extra.insert(
            "added_by_newer_version".to_string(),
            serde_json::json!({"nested": [1, 2, 3]}),
        );

        let json = serde_json::to_string(&record).unwrap();
        let loaded: ContextRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(
            loaded.extra.get("added_by_newer_version"),
            Some(&serde_json::json!({"nested": [1, 2, 3]}))
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&WorkflowStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let json = serde_json::to_string(&ExecutionOutcome::FallbackTriggered).unwrap();
        assert_eq!(json, "\"fallback_triggered\"");
    }
}
