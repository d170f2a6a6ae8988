//! Background persistence of optimistic changes.
//!
//! Each [`Mutation`] runs as its own tokio task. Writes inside a mutation
//! run in sequence and stop at the first failure; separate mutations run
//! concurrently with no ordering between them. Outcomes come back over a
//! channel and are collected with [`Synchronizer::try_outcomes`] or
//! [`Synchronizer::wait_all`]. A failure is also announced on the event
//! channel, if one is attached, as soon as it happens.

use std::sync::Arc;

use planboard_store::{EditorPatch, EditorRow, JobPatch, JobRow, RecordStore, StoreError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::PlannerError;
use crate::events::{Collection, PlannerEvent};
use crate::notes::{self, NoteSaveError};

/// A single durable write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    InsertEditor(EditorRow),
    UpdateEditor { id: String, patch: EditorPatch },
    DeleteEditor { id: String },
    InsertJob(JobRow),
    UpdateJob { id: String, patch: JobPatch },
    ReassignJobs { from: String, to: String },
    DeleteJob { id: String },
    SaveNote {
        owner: String,
        job_id: String,
        content: String,
    },
}

impl StoreWrite {
    fn describe(&self) -> String {
        match self {
            Self::InsertEditor(row) => format!("insert editor {}", row.id),
            Self::UpdateEditor { id, .. } => format!("update editor {id}"),
            Self::DeleteEditor { id } => format!("delete editor {id}"),
            Self::InsertJob(row) => format!("insert job {}", row.id),
            Self::UpdateJob { id, .. } => format!("update job {id}"),
            Self::ReassignJobs { from, to } => format!("reassign jobs {from} -> {to}"),
            Self::DeleteJob { id } => format!("delete job {id}"),
            Self::SaveNote { job_id, .. } => format!("save note {job_id}"),
        }
    }

    async fn apply(&self, store: &dyn RecordStore) -> Result<(), WriteFailure> {
        let result: Result<(), StoreError> = match self {
            Self::InsertEditor(row) => store.insert_editor(row).await,
            Self::UpdateEditor { id, patch } => store.update_editor(id, patch).await,
            Self::DeleteEditor { id } => store.delete_editor(id).await,
            Self::InsertJob(row) => store.insert_job(row).await,
            Self::UpdateJob { id, patch } => store.update_job(id, patch).await,
            Self::ReassignJobs { from, to } => store.reassign_jobs(from, to).await,
            Self::DeleteJob { id } => store.delete_job(id).await,
            Self::SaveNote {
                owner,
                job_id,
                content,
            } => {
                return notes::save_note(store, owner, job_id, content)
                    .await
                    .map(|_| ())
                    .map_err(WriteFailure::Note);
            }
        };
        result.map_err(|source| {
            WriteFailure::Store(PlannerError::RemoteWrite {
                operation: self.describe(),
                source,
            })
        })
    }
}

/// A labelled group of writes persisting one planner operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub label: String,
    /// What to reconcile if any write fails.
    pub collection: Collection,
    pub writes: Vec<StoreWrite>,
}

impl Mutation {
    pub fn new(label: impl Into<String>, collection: Collection) -> Self {
        Self {
            label: label.into(),
            collection,
            writes: Vec::new(),
        }
    }

    pub fn with(mut self, write: StoreWrite) -> Self {
        self.writes.push(write);
        self
    }

    pub fn push(&mut self, write: StoreWrite) {
        self.writes.push(write);
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Why a mutation did not complete.
#[derive(Debug)]
pub enum WriteFailure {
    /// A store write failed ([`PlannerError::RemoteWrite`]).
    Store(PlannerError),
    /// Both note paths failed.
    Note(NoteSaveError),
    /// The mutation was cancelled before completing.
    Cancelled,
}

impl WriteFailure {
    /// The event announcing this failure of the mutation `operation`.
    pub fn event(&self, operation: &str) -> PlannerEvent {
        match self {
            Self::Note(e) => PlannerEvent::NoteSaveFailed {
                job_id: e.job_id.clone(),
                error: e.to_string(),
            },
            other => PlannerEvent::WriteFailed {
                operation: operation.to_string(),
                error: other.to_string(),
            },
        }
    }
}

impl std::fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{e}"),
            Self::Note(e) => write!(f, "{e}"),
            Self::Cancelled => f.write_str("write cancelled"),
        }
    }
}

/// Completion report of one mutation.
#[derive(Debug)]
pub struct WriteOutcome {
    pub id: u64,
    pub label: String,
    pub collection: Collection,
    pub result: Result<(), WriteFailure>,
}

/// Handle to a submitted mutation.
#[derive(Debug, Clone)]
pub struct WriteHandle {
    id: u64,
    token: CancellationToken,
}

impl WriteHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the mutation at its next await point. It reports as cancelled.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Runs mutations against the store in tracked background tasks.
pub struct Synchronizer {
    store: Arc<dyn RecordStore>,
    tasks: JoinSet<()>,
    outcome_tx: mpsc::UnboundedSender<WriteOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<WriteOutcome>,
    cancel: CancellationToken,
    events: Option<broadcast::Sender<PlannerEvent>>,
    next_id: u64,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            store,
            tasks: JoinSet::new(),
            outcome_tx,
            outcome_rx,
            cancel: CancellationToken::new(),
            events: None,
            next_id: 0,
        }
    }

    /// Announce failures on `events` from the task that hit them.
    pub fn with_events(mut self, events: broadcast::Sender<PlannerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Spawn a task performing the mutation's writes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, mutation: Mutation) -> WriteHandle {
        self.next_id += 1;
        let id = self.next_id;
        let token = self.cancel.child_token();
        let handle = WriteHandle {
            id,
            token: token.clone(),
        };

        let store = Arc::clone(&self.store);
        let tx = self.outcome_tx.clone();
        let events = self.events.clone();
        debug!(id, label = %mutation.label, writes = mutation.writes.len(), "submitting mutation");
        self.tasks.spawn(async move {
            let Mutation {
                label,
                collection,
                writes,
            } = mutation;
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(WriteFailure::Cancelled),
                result = run_writes(store.as_ref(), &writes) => result,
            };
            if let (Err(failure), Some(events)) = (&result, &events) {
                // No subscribers is fine.
                let _ = events.send(failure.event(&label));
            }
            // The receiver lives as long as the synchronizer.
            let _ = tx.send(WriteOutcome {
                id,
                label,
                collection,
                result,
            });
        });
        handle
    }

    /// Mutations submitted but not yet collected.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Collect outcomes of mutations that already finished, without waiting.
    pub fn try_outcomes(&mut self) -> Vec<WriteOutcome> {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "write task aborted");
            }
        }
        self.drain()
    }

    /// Wait for every in-flight mutation, then collect all outcomes.
    pub async fn wait_all(&mut self) -> Vec<WriteOutcome> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "write task aborted");
            }
        }
        self.drain()
    }

    /// Cancel every in-flight mutation. Later submissions are unaffected.
    pub fn cancel_all(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    fn drain(&mut self) -> Vec<WriteOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|outcome| outcome.id);
        outcomes
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_writes(store: &dyn RecordStore, writes: &[StoreWrite]) -> Result<(), WriteFailure> {
    for write in writes {
        write.apply(store).await?;
    }
    Ok(())
}
