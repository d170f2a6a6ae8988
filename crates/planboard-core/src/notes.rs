//! Job notes over two storage paths.
//!
//! Notes prefer a dedicated `job_notes` record per job. Deployments that
//! have not provisioned that table keep working through the legacy inline
//! `jobs.notes` column.

use std::collections::HashMap;

use chrono::Utc;
use planboard_store::{JobPatch, NoteRow, RecordStore, StoreError};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Which path a note was written through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotePath {
    Dedicated,
    Inline,
}

/// Both note paths failed.
#[derive(Debug, Error)]
#[error(
    "could not save note for job {job_id}: the job_notes table is missing or unreachable \
     and the inline notes column rejected the write; provision the job_notes table to store notes"
)]
pub struct NoteSaveError {
    pub job_id: String,
    pub dedicated: StoreError,
    #[source]
    pub inline: StoreError,
}

/// Pick the visible note: the dedicated record whenever one exists, even
/// if empty, else the inline column.
pub fn resolve_note(dedicated: Option<&str>, inline: Option<&str>) -> String {
    dedicated.or(inline).unwrap_or_default().to_string()
}

/// Fetch all dedicated notes of `owner`, keyed by job id.
///
/// A failed read yields no dedicated notes so that inline notes still show.
pub async fn load_notes(store: &dyn RecordStore, owner: &str) -> HashMap<String, String> {
    match store.list_notes(owner).await {
        Ok(rows) => rows.into_iter().map(|row| (row.job_id, row.content)).collect(),
        Err(e) => {
            warn!(error = %e, "dedicated notes unavailable, using inline notes");
            HashMap::new()
        }
    }
}

/// Persist `content` as the note of `job_id`.
///
/// Writes the dedicated record (update when present, insert otherwise) and
/// falls back to the inline column. Other job fields are never touched.
pub async fn save_note(
    store: &dyn RecordStore,
    owner: &str,
    job_id: &str,
    content: &str,
) -> Result<NotePath, NoteSaveError> {
    let dedicated = match save_dedicated(store, owner, job_id, content).await {
        Ok(()) => {
            debug!(job_id, "note saved to dedicated table");
            return Ok(NotePath::Dedicated);
        }
        Err(e) => e,
    };

    warn!(job_id, error = %dedicated, "dedicated note write failed, falling back to inline column");
    match store.update_job(job_id, &JobPatch::notes(content)).await {
        Ok(()) => Ok(NotePath::Inline),
        Err(inline) => Err(NoteSaveError {
            job_id: job_id.to_string(),
            dedicated,
            inline,
        }),
    }
}

async fn save_dedicated(
    store: &dyn RecordStore,
    owner: &str,
    job_id: &str,
    content: &str,
) -> Result<(), StoreError> {
    match store.find_note(job_id).await? {
        Some(_) => store.update_note(job_id, content).await,
        None => {
            let row = NoteRow {
                id: Uuid::new_v4().to_string(),
                job_id: job_id.to_string(),
                user_id: owner.to_string(),
                content: content.to_string(),
                updated_at: Some(Utc::now()),
            };
            store.insert_note(&row).await
        }
    }
}
