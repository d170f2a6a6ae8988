//! Durable record store boundary for planboard.
//!
//! This crate defines the wire schema of every stored entity and the
//! [`RecordStore`] seam the planner writes through:
//!
//! - **Rows**: serde structs mirroring the `editors`, `jobs`, `job_notes`
//!   and `profiles` tables
//! - **RestStore**: PostgREST-style HTTP client with password login
//! - **MemoryStore**: in-process store with fault injection, used by tests
//!   and offline runs

mod client;
mod error;
pub mod memory;
mod records;
mod store;
mod types;

pub use client::RestStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use records::*;
pub use store::{RecordStore, SessionProvider, StaticSession};
pub use types::*;
