//! Error types for planner operations.

use planboard_store::StoreError;
use thiserror::Error;

/// Errors that can occur in planner operations.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// A required field is missing or out of range. Nothing was changed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The editor count is at the entitlement cap. Nothing was changed.
    #[error("plan limit reached: at most {limit} editors on the current plan")]
    PlanLimitExceeded { limit: usize },

    /// A durable write failed after the optimistic change was applied.
    #[error("remote write failed during {operation}: {source}")]
    RemoteWrite {
        operation: String,
        #[source]
        source: StoreError,
    },

    /// An initial or reconciliation fetch failed.
    #[error("remote read failed: {0}")]
    RemoteRead(#[source] StoreError),

    /// A stored row does not satisfy the model's schema.
    #[error("invalid record: {0}")]
    Schema(String),

    /// Job not found in memory.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// Editor not found in memory.
    #[error("editor not found: {0}")]
    EditorNotFound(String),

    /// The editor still has jobs and no reassignment target was given.
    #[error("editor {editor_id} still has {count} assigned jobs")]
    EditorHasJobs { editor_id: String, count: usize },

    /// No user is signed in.
    #[error("not signed in")]
    NotAuthenticated,
}
