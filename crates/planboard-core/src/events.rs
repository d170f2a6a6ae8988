//! Planner notifications.

use std::fmt;

/// A persisted collection that can be reconciled from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Editors,
    /// Jobs together with their notes.
    Jobs,
    /// Both editors and jobs.
    All,
}

impl Collection {
    /// The concrete collections this one stands for.
    pub fn expand(self) -> &'static [Collection] {
        match self {
            Self::Editors => &[Self::Editors],
            Self::Jobs => &[Self::Jobs],
            Self::All => &[Self::Editors, Self::Jobs],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Editors => f.write_str("editors"),
            Self::Jobs => f.write_str("jobs"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Events broadcast to planner subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerEvent {
    /// Initial data arrived.
    Loaded { editors: usize, jobs: usize },
    /// Initial fetch failed; collections were cleared.
    LoadFailed { error: String },
    /// A background write failed and its optimistic change will be rolled back.
    WriteFailed { operation: String, error: String },
    /// A collection was replaced with a fresh read.
    Reconciled { collection: Collection },
    /// Reconciliation itself failed; local state may be stale.
    ReconcileFailed { collection: Collection, error: String },
    /// A note could not be stored through either path.
    NoteSaveFailed { job_id: String, error: String },
    /// The balancer reassigned jobs.
    Rebalanced { moves: usize },
}
