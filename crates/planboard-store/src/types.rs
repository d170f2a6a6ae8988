//! Wire rows for the planner tables.
//!
//! Rows mirror the stored columns exactly. Enum-like columns (`priority`,
//! `status`, `plan_type`) stay plain strings here; callers validate them
//! before admitting a row into their own model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An `editors` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub weekly_capacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial update for an `editors` row. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_capacity: Option<f64>,
}

impl EditorPatch {
    /// True when the patch would not change any column.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.weekly_capacity.is_none()
    }

    /// Apply the patch to a row in place.
    pub fn apply_to(&self, row: &mut EditorRow) {
        if let Some(name) = &self.name {
            row.name = name.clone();
        }
        if let Some(capacity) = self.weekly_capacity {
            row.weekly_capacity = capacity;
        }
    }
}

/// A `jobs` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRow {
    pub id: String,
    pub user_id: String,
    pub editor_id: String,
    pub title: String,
    pub client_name: String,
    pub scheduled_date: i64,
    pub week_start: NaiveDate,
    pub estimated_hours: f64,
    pub priority: String,
    pub status: String,
    pub order: i64,
    /// Legacy inline note column.
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial update for a `jobs` row. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl JobPatch {
    /// Patch that only rewrites the cell position.
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }

    /// Patch that only rewrites the inline note column.
    pub fn notes(content: impl Into<String>) -> Self {
        Self {
            notes: Some(content.into()),
            ..Default::default()
        }
    }

    /// True when the patch would not change any column.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to a row in place.
    pub fn apply_to(&self, row: &mut JobRow) {
        if let Some(title) = &self.title {
            row.title = title.clone();
        }
        if let Some(client_name) = &self.client_name {
            row.client_name = client_name.clone();
        }
        if let Some(editor_id) = &self.editor_id {
            row.editor_id = editor_id.clone();
        }
        if let Some(day) = self.scheduled_date {
            row.scheduled_date = day;
        }
        if let Some(week_start) = self.week_start {
            row.week_start = week_start;
        }
        if let Some(hours) = self.estimated_hours {
            row.estimated_hours = hours;
        }
        if let Some(priority) = &self.priority {
            row.priority = priority.clone();
        }
        if let Some(status) = &self.status {
            row.status = status.clone();
        }
        if let Some(order) = self.order {
            row.order = order;
        }
        if let Some(notes) = &self.notes {
            row.notes = Some(notes.clone());
        }
    }
}

/// A `job_notes` row: the dedicated note for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: String,
    pub job_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A `profiles` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub plan_type: String,
}

/// Authenticated session returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SessionUser,
}

/// The user a session belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}
