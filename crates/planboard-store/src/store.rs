//! Store and session seams.

use async_trait::async_trait;

use crate::{EditorPatch, EditorRow, JobPatch, JobRow, NoteRow, ProfileRow, StoreError};

/// Per-entity CRUD against the durable store.
///
/// Listing is scoped by owner. Updates of a missing row fail with
/// [`StoreError::NotFound`]; deletes of a missing row succeed. Deleting a
/// job removes its dedicated note.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List editors owned by `owner`, oldest first.
    async fn list_editors(&self, owner: &str) -> Result<Vec<EditorRow>, StoreError>;

    async fn insert_editor(&self, row: &EditorRow) -> Result<(), StoreError>;

    async fn update_editor(&self, id: &str, patch: &EditorPatch) -> Result<(), StoreError>;

    async fn delete_editor(&self, id: &str) -> Result<(), StoreError>;

    /// List every job owned by `owner`, across all weeks.
    async fn list_jobs(&self, owner: &str) -> Result<Vec<JobRow>, StoreError>;

    async fn insert_job(&self, row: &JobRow) -> Result<(), StoreError>;

    async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<(), StoreError>;

    /// Point every job of editor `from` at editor `to`.
    async fn reassign_jobs(&self, from: &str, to: &str) -> Result<(), StoreError>;

    async fn delete_job(&self, id: &str) -> Result<(), StoreError>;

    /// List dedicated notes owned by `owner`.
    async fn list_notes(&self, owner: &str) -> Result<Vec<NoteRow>, StoreError>;

    /// Find the dedicated note for a job, if one exists.
    async fn find_note(&self, job_id: &str) -> Result<Option<NoteRow>, StoreError>;

    async fn insert_note(&self, row: &NoteRow) -> Result<(), StoreError>;

    /// Replace the content of the dedicated note for `job_id`.
    async fn update_note(&self, job_id: &str, content: &str) -> Result<(), StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, StoreError>;
}

/// Yields the identifier of the signed-in user, gating all reads and writes.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self) -> Option<String>;
}

/// A session provider with a fixed user.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user_id: Option<String>,
}

impl StaticSession {
    /// A session signed in as `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// A signed-out session.
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_user(&self) -> Option<String> {
        self.user_id.clone()
    }
}
