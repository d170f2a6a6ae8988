//! Week planner core.
//!
//! This crate owns the in-memory planning state and keeps it consistent
//! with the durable store:
//! - Jobs live in (editor, day, week) cells with contiguous ordering
//! - Capacity is derived on demand from assigned hours
//! - A greedy balancer evens out per-day load across editors
//! - Every mutation is applied optimistically, persisted in the background
//!   and reconciled from the store when a write fails

pub mod balancer;
pub mod capacity;
pub mod cells;
mod config;
mod error;
mod events;
pub mod notes;
mod planner;
pub mod sync;
mod types;
mod week;

pub use balancer::{BalancePlan, Reassignment};
pub use cells::{CellKey, Reorder};
pub use config::{BalancerConfig, PlannerConfig};
pub use error::PlannerError;
pub use events::{Collection, PlannerEvent};
pub use notes::{NotePath, NoteSaveError};
pub use planner::{Planner, SyncSummary};
pub use sync::{Mutation, StoreWrite, Synchronizer, WriteHandle};
pub use types::{
    DAYS_PER_WEEK, Editor, EditorUpdate, Job, JobUpdate, NewEditor, NewJob, PlanTier, Priority,
    Status,
};
pub use week::WeekWindow;
