//! Workflow context: the shared record agents read and mutate, plus the
//! file-backed store that persists it.

mod record;
mod store;

pub use record::{
    ContextRecord, ExecutionEntry, ExecutionOutcome, StateValue, WorkflowStatus,
};
pub use store::{ContextStore, RecordSummary, StoreSummary};
