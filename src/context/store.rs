//! File-backed context store: one JSON document per workflow.
//!
//! Layout under the base directory:
//!
//! ```text
//! <base>/records/<workflow_id>.json   live records
//! <base>/archive/<workflow_id>.json   archived records
//! ```
//!
//! Saves are atomic (temp file + rename), so a reader never observes a
//! half-written document. The store provides no locking: it assumes at most
//! one writer per workflow id at a time, and deployments needing concurrent
//! writers against the same workflow must serialize externally. Distinct
//! workflows can be processed fully in parallel.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::context::record::{ContextRecord, StateValue, WorkflowStatus};
use crate::error::StorageError;

const RECORDS_DIR: &str = "records";
const ARCHIVE_DIR: &str = "archive";

/// Lightweight view of a stored record, used by listing and the CLI.
#[derive(Debug, Clone)]
pub struct RecordSummary {
    pub workflow_id: Uuid,
    pub status: WorkflowStatus,
    pub task: String,
    pub updated_at: DateTime<Utc>,
}

/// Per-status counts over the live namespace.
#[derive(Debug, Clone, Default)]
pub struct StoreSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Durable CRUD over context records.
pub struct ContextStore {
    base: PathBuf,
}

impl ContextStore {
    /// Open a store rooted at `base`, creating the namespaces if needed.
    pub fn open(base: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base = base.into();
        let store = Self { base };
        fs::create_dir_all(store.records_dir())
            .map_err(|e| StorageError::io(store.records_dir(), e))?;
        fs::create_dir_all(store.archive_dir())
            .map_err(|e| StorageError::io(store.archive_dir(), e))?;
        Ok(store)
    }

    /// Directory holding live records.
    pub fn records_dir(&self) -> PathBuf {
        self.base.join(RECORDS_DIR)
    }

    /// Directory holding archived records.
    pub fn archive_dir(&self) -> PathBuf {
        self.base.join(ARCHIVE_DIR)
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.records_dir().join(format!("{id}.json"))
    }

    fn archive_path(&self, id: Uuid) -> PathBuf {
        self.archive_dir().join(format!("{id}.json"))
    }

    /// Create a new pending record and persist it immediately.
    pub fn create(
        &self,
        task: &str,
        initial_state: BTreeMap<String, StateValue>,
    ) -> Result<ContextRecord, StorageError> {
        let record = ContextRecord::new(task, initial_state);
        write_atomic(&self.record_path(record.workflow_id), &record)?;
        tracing::info!(workflow_id = %record.workflow_id, task, "created workflow record");
        Ok(record)
    }

    /// Load a live record by workflow id.
    pub fn load(&self, id: Uuid) -> Result<ContextRecord, StorageError> {
        let path = self.record_path(id);
        read_record(&path, id)
    }

    /// Persist a record atomically, refreshing `updated_at`.
    ///
    /// On failure the in-memory record stays valid but is not durable until a
    /// later successful save.
    pub fn save(&self, record: &mut ContextRecord) -> Result<(), StorageError> {
        record.touch();
        write_atomic(&self.record_path(record.workflow_id), record)
    }

    /// Archive a record: mark it `archived` and move it to the archive
    /// namespace. A subsequent [`load`](Self::load) on the live namespace
    /// fails with `NotFound`.
    pub fn archive(&self, id: Uuid) -> Result<(), StorageError> {
        let mut record = self.load(id)?;
        record.transition(WorkflowStatus::Archived)?;
        write_atomic(&self.archive_path(id), &record)?;
        let live = self.record_path(id);
        fs::remove_file(&live).map_err(|e| StorageError::io(live, e))?;
        tracing::info!(workflow_id = %id, "archived workflow record");
        Ok(())
    }

    /// Load a record from the archive namespace.
    pub fn load_archived(&self, id: Uuid) -> Result<ContextRecord, StorageError> {
        read_record(&self.archive_path(id), id)
    }

    /// Archive every non-terminal record whose `updated_at` precedes the
    /// cutoff, returning the count archived. Idempotent: a second sweep with
    /// the same window archives nothing further.
    pub fn cleanup(&self, older_than: Duration) -> Result<usize, StorageError> {
        let cutoff = Utc::now() - older_than;
        let mut archived = 0;

        for summary in self.list(None)? {
            if summary.status.is_terminal() {
                continue;
            }
            if summary.updated_at < cutoff {
                self.archive(summary.workflow_id)?;
                archived += 1;
            }
        }

        if archived > 0 {
            tracing::info!(archived, cutoff = %cutoff, "cleanup sweep archived stale workflows");
        }
        Ok(archived)
    }

    /// Enumerate live records lazily, optionally filtered by status.
    ///
    /// Each call starts a fresh enumeration; no cursor state is retained.
    /// Documents that cannot be parsed are skipped with a warning so one bad
    /// file does not wedge listing or cleanup (loading them directly still
    /// surfaces `Corrupted`).
    pub fn list(
        &self,
        status_filter: Option<WorkflowStatus>,
    ) -> Result<impl Iterator<Item = RecordSummary>, StorageError> {
        let dir = self.records_dir();
        let entries = fs::read_dir(&dir).map_err(|e| StorageError::io(dir, e))?;

        Ok(entries.filter_map(move |entry| {
            let path = entry.ok()?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                return None;
            }
            let record: ContextRecord = match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|data| serde_json::from_str(&data).map_err(|e| e.to_string()))
            {
                Ok(record) => record,
                Err(reason) => {
                    tracing::warn!(path = %path.display(), reason, "skipping unparseable record");
                    return None;
                }
            };
            if status_filter.is_some_and(|want| record.status != want) {
                return None;
            }
            Some(RecordSummary {
                workflow_id: record.workflow_id,
                status: record.status,
                task: record.task,
                updated_at: record.updated_at,
            })
        }))
    }

    /// Count live records by status.
    pub fn summary(&self) -> Result<StoreSummary, StorageError> {
        let mut summary = StoreSummary::default();
        for record in self.list(None)? {
            summary.total += 1;
            match record.status {
                WorkflowStatus::Pending => summary.pending += 1,
                WorkflowStatus::Running => summary.running += 1,
                WorkflowStatus::Completed => summary.completed += 1,
                WorkflowStatus::Failed => summary.failed += 1,
                WorkflowStatus::Archived => {}
            }
        }
        Ok(summary)
    }
}

fn read_record(path: &Path, id: Uuid) -> Result<ContextRecord, StorageError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound { id });
        }
        Err(e) => return Err(StorageError::io(path, e)),
    };

    serde_json::from_str(&data).map_err(|e| StorageError::Corrupted {
        id,
        reason: e.to_string(),
    })
}

/// Write a record to `path` via a sibling temp file and rename, so a crash
/// mid-write never leaves a half-written document.
fn write_atomic(path: &Path, record: &ContextRecord) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(record)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::record::ExecutionOutcome;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn open_store(dir: &tempfile::TempDir) -> ContextStore {
        ContextStore::open(dir.path()).unwrap()
    }

    #[test]
    fn create_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let mut state = BTreeMap::new();
        state.insert("phase".to_string(), StateValue::String("init".into()));
        let record = store.create("export apex app", state).unwrap();

        let loaded = store.load(record.workflow_id).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn save_refreshes_updated_at_and_persists_mutations() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let mut record = store.create("demo", BTreeMap::new()).unwrap();
        let created = record.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(2));
        record.log_entry("planner", ExecutionOutcome::Success, "done");
        store.save(&mut record).unwrap();
        assert!(record.updated_at > created);

        let loaded = store.load(record.workflow_id).unwrap();
        assert_eq!(loaded.execution_log.len(), 1);
        assert_eq!(loaded.updated_at, record.updated_at);
    }

    #[test]
    fn load_missing_record_is_not_found() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let err = store.load(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn load_corrupt_record_surfaces_corruption() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let record = store.create("demo", BTreeMap::new()).unwrap();
        let path = store.records_dir().join(format!("{}.json", record.workflow_id));
        fs::write(&path, "{ not json").unwrap();

        let err = store.load(record.workflow_id).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { .. }));
    }

    #[test]
    fn archive_moves_record_out_of_live_namespace() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let mut record = store.create("demo", BTreeMap::new()).unwrap();
        record.transition(WorkflowStatus::Running).unwrap();
        record.transition(WorkflowStatus::Completed).unwrap();
        store.save(&mut record).unwrap();

        store.archive(record.workflow_id).unwrap();

        let err = store.load(record.workflow_id).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        let archived = store.load_archived(record.workflow_id).unwrap();
        assert_eq!(archived.status, WorkflowStatus::Archived);
        // Pre-archive history is untouched
        assert_eq!(archived.task, "demo");
    }

    #[test]
    fn list_filters_by_status() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let _pending = store.create("a", BTreeMap::new()).unwrap();
        let mut running = store.create("b", BTreeMap::new()).unwrap();
        running.transition(WorkflowStatus::Running).unwrap();
        store.save(&mut running).unwrap();

        let all: Vec<_> = store.list(None).unwrap().collect();
        assert_eq!(all.len(), 2);

        let only_running: Vec<_> = store
            .list(Some(WorkflowStatus::Running))
            .unwrap()
            .collect();
        assert_eq!(only_running.len(), 1);
        assert_eq!(only_running[0].workflow_id, running.workflow_id);
    }

    #[test]
    fn list_skips_unparseable_documents() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.create("good", BTreeMap::new()).unwrap();
        fs::write(store.records_dir().join("junk.json"), "not json").unwrap();

        let all: Vec<_> = store.list(None).unwrap().collect();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn summary_counts_by_status() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.create("a", BTreeMap::new()).unwrap();
        store.create("b", BTreeMap::new()).unwrap();
        let mut done = store.create("c", BTreeMap::new()).unwrap();
        done.transition(WorkflowStatus::Running).unwrap();
        done.transition(WorkflowStatus::Completed).unwrap();
        store.save(&mut done).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.running, 0);
    }

    #[test]
    fn no_temp_files_left_behind_after_save() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let mut record = store.create("demo", BTreeMap::new()).unwrap();
        store.save(&mut record).unwrap();

        let leftovers: Vec<_> = fs::read_dir(store.records_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
