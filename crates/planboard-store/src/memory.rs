//! In-process record store.
//!
//! Behaves like the REST store (foreign keys, cascade on job delete,
//! owner-scoped listing) and lets callers inject failures per table, which
//! is how reconciliation and note fallback paths get exercised.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use crate::{
    EDITORS_TABLE, EditorPatch, EditorRow, JOBS_TABLE, JobPatch, JobRow, NOTES_TABLE, NoteRow,
    PROFILES_TABLE, ProfileRow, RecordStore, StoreError,
};

/// Stored rows, in insertion order.
#[derive(Debug, Default)]
struct Tables {
    editors: Vec<EditorRow>,
    jobs: Vec<JobRow>,
    notes: Vec<NoteRow>,
    profiles: HashMap<String, ProfileRow>,
}

/// Injected failures.
#[derive(Debug, Default)]
struct Faults {
    unavailable: HashSet<&'static str>,
    failing_writes: HashMap<&'static str, usize>,
    /// Writes let through before `failing_writes` starts counting down.
    passing_writes: HashMap<&'static str, usize>,
    failing_reads: HashMap<&'static str, usize>,
    write_delay: Option<Duration>,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    faults: RwLock<Faults>,
}

fn injected(table: &str) -> StoreError {
    StoreError::Rejected {
        status: 503,
        code: None,
        message: format!("injected failure on {}", table),
    }
}

fn foreign_key(message: String) -> StoreError {
    StoreError::Rejected {
        status: 409,
        code: Some("23503".to_string()),
        message,
    }
}

fn duplicate(table: &str, id: &str) -> StoreError {
    StoreError::Rejected {
        status: 409,
        code: Some("23505".to_string()),
        message: format!("duplicate key {} in {}", id, table),
    }
}

fn not_found(table: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        table: table.to_string(),
        id: id.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `table` fail as if the table did not exist.
    pub async fn set_unavailable(&self, table: &'static str, unavailable: bool) {
        let mut faults = self.faults.write().await;
        if unavailable {
            faults.unavailable.insert(table);
        } else {
            faults.unavailable.remove(table);
        }
    }

    /// Fail the next `count` writes to `table`.
    pub async fn fail_next_writes(&self, table: &'static str, count: usize) {
        self.fail_writes_after(table, 0, count).await;
    }

    /// Let `passing` writes to `table` succeed, then fail the next `count`.
    pub async fn fail_writes_after(&self, table: &'static str, passing: usize, count: usize) {
        let mut faults = self.faults.write().await;
        faults.passing_writes.insert(table, passing);
        faults.failing_writes.insert(table, count);
    }

    /// Fail the next `count` reads of `table`.
    pub async fn fail_next_reads(&self, table: &'static str, count: usize) {
        self.faults.write().await.failing_reads.insert(table, count);
    }

    /// Delay every write by `delay` before it is applied.
    pub async fn set_write_delay(&self, delay: Option<Duration>) {
        self.faults.write().await.write_delay = delay;
    }

    /// Set the entitlement tier of a user.
    pub async fn set_plan(&self, user_id: &str, plan_type: &str) {
        self.tables.write().await.profiles.insert(
            user_id.to_string(),
            ProfileRow {
                id: user_id.to_string(),
                plan_type: plan_type.to_string(),
            },
        );
    }

    /// Snapshot of every stored editor.
    pub async fn editors(&self) -> Vec<EditorRow> {
        self.tables.read().await.editors.clone()
    }

    /// Snapshot of every stored job.
    pub async fn jobs(&self) -> Vec<JobRow> {
        self.tables.read().await.jobs.clone()
    }

    /// Snapshot of a single stored job.
    pub async fn job(&self, id: &str) -> Option<JobRow> {
        self.tables
            .read()
            .await
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }

    /// Snapshot of every stored dedicated note.
    pub async fn notes(&self) -> Vec<NoteRow> {
        self.tables.read().await.notes.clone()
    }

    async fn check_read(&self, table: &'static str) -> Result<(), StoreError> {
        let mut faults = self.faults.write().await;
        if faults.unavailable.contains(table) {
            return Err(StoreError::Unavailable {
                table: table.to_string(),
            });
        }
        if let Some(remaining) = faults.failing_reads.get_mut(table) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(injected(table));
            }
        }
        Ok(())
    }

    async fn check_write(&self, table: &'static str) -> Result<(), StoreError> {
        let delay = {
            let mut guard = self.faults.write().await;
            let faults = &mut *guard;
            if faults.unavailable.contains(table) {
                return Err(StoreError::Unavailable {
                    table: table.to_string(),
                });
            }
            if let Some(remaining) = faults.failing_writes.get_mut(table) {
                if *remaining > 0 {
                    match faults.passing_writes.get_mut(table) {
                        Some(passing) if *passing > 0 => *passing -= 1,
                        _ => {
                            *remaining -= 1;
                            return Err(injected(table));
                        }
                    }
                }
            }
            faults.write_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_editors(&self, owner: &str) -> Result<Vec<EditorRow>, StoreError> {
        self.check_read(EDITORS_TABLE).await?;
        let tables = self.tables.read().await;
        let mut rows: Vec<EditorRow> = tables
            .editors
            .iter()
            .filter(|e| e.user_id == owner)
            .cloned()
            .collect();
        // Stable: rows without a timestamp keep insertion order.
        rows.sort_by_key(|e| e.created_at);
        Ok(rows)
    }

    async fn insert_editor(&self, row: &EditorRow) -> Result<(), StoreError> {
        self.check_write(EDITORS_TABLE).await?;
        let mut tables = self.tables.write().await;
        if tables.editors.iter().any(|e| e.id == row.id) {
            return Err(duplicate(EDITORS_TABLE, &row.id));
        }
        tables.editors.push(row.clone());
        trace!(id = %row.id, "inserted editor");
        Ok(())
    }

    async fn update_editor(&self, id: &str, patch: &EditorPatch) -> Result<(), StoreError> {
        self.check_write(EDITORS_TABLE).await?;
        let mut tables = self.tables.write().await;
        let row = tables
            .editors
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| not_found(EDITORS_TABLE, id))?;
        patch.apply_to(row);
        Ok(())
    }

    async fn delete_editor(&self, id: &str) -> Result<(), StoreError> {
        self.check_write(EDITORS_TABLE).await?;
        let mut tables = self.tables.write().await;
        if tables.jobs.iter().any(|j| j.editor_id == id) {
            return Err(foreign_key(format!("editor {} still has jobs", id)));
        }
        tables.editors.retain(|e| e.id != id);
        Ok(())
    }

    async fn list_jobs(&self, owner: &str) -> Result<Vec<JobRow>, StoreError> {
        self.check_read(JOBS_TABLE).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .iter()
            .filter(|j| j.user_id == owner)
            .cloned()
            .collect())
    }

    async fn insert_job(&self, row: &JobRow) -> Result<(), StoreError> {
        self.check_write(JOBS_TABLE).await?;
        let mut tables = self.tables.write().await;
        if tables.jobs.iter().any(|j| j.id == row.id) {
            return Err(duplicate(JOBS_TABLE, &row.id));
        }
        if !tables.editors.iter().any(|e| e.id == row.editor_id) {
            return Err(foreign_key(format!("unknown editor {}", row.editor_id)));
        }
        tables.jobs.push(row.clone());
        trace!(id = %row.id, "inserted job");
        Ok(())
    }

    async fn update_job(&self, id: &str, patch: &JobPatch) -> Result<(), StoreError> {
        self.check_write(JOBS_TABLE).await?;
        let mut tables = self.tables.write().await;
        if let Some(editor_id) = &patch.editor_id {
            if !tables.editors.iter().any(|e| &e.id == editor_id) {
                return Err(foreign_key(format!("unknown editor {}", editor_id)));
            }
        }
        let row = tables
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| not_found(JOBS_TABLE, id))?;
        patch.apply_to(row);
        Ok(())
    }

    async fn reassign_jobs(&self, from: &str, to: &str) -> Result<(), StoreError> {
        self.check_write(JOBS_TABLE).await?;
        let mut tables = self.tables.write().await;
        if !tables.editors.iter().any(|e| e.id == to) {
            return Err(foreign_key(format!("unknown editor {}", to)));
        }
        for job in tables.jobs.iter_mut().filter(|j| j.editor_id == from) {
            job.editor_id = to.to_string();
        }
        Ok(())
    }

    async fn delete_job(&self, id: &str) -> Result<(), StoreError> {
        self.check_write(JOBS_TABLE).await?;
        let mut tables = self.tables.write().await;
        tables.jobs.retain(|j| j.id != id);
        tables.notes.retain(|n| n.job_id != id);
        Ok(())
    }

    async fn list_notes(&self, owner: &str) -> Result<Vec<NoteRow>, StoreError> {
        self.check_read(NOTES_TABLE).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .notes
            .iter()
            .filter(|n| n.user_id == owner)
            .cloned()
            .collect())
    }

    async fn find_note(&self, job_id: &str) -> Result<Option<NoteRow>, StoreError> {
        self.check_read(NOTES_TABLE).await?;
        let tables = self.tables.read().await;
        Ok(tables.notes.iter().find(|n| n.job_id == job_id).cloned())
    }

    async fn insert_note(&self, row: &NoteRow) -> Result<(), StoreError> {
        self.check_write(NOTES_TABLE).await?;
        let mut tables = self.tables.write().await;
        if !tables.jobs.iter().any(|j| j.id == row.job_id) {
            return Err(foreign_key(format!("unknown job {}", row.job_id)));
        }
        if tables.notes.iter().any(|n| n.job_id == row.job_id) {
            return Err(duplicate(NOTES_TABLE, &row.job_id));
        }
        tables.notes.push(row.clone());
        Ok(())
    }

    async fn update_note(&self, job_id: &str, content: &str) -> Result<(), StoreError> {
        self.check_write(NOTES_TABLE).await?;
        let mut tables = self.tables.write().await;
        let row = tables
            .notes
            .iter_mut()
            .find(|n| n.job_id == job_id)
            .ok_or_else(|| not_found(NOTES_TABLE, job_id))?;
        row.content = content.to_string();
        row.updated_at = Some(chrono::Utc::now());
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, StoreError> {
        self.check_read(PROFILES_TABLE).await?;
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }
}
