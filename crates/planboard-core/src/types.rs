//! Planner model types.
//!
//! Rows coming out of the store are admitted through `TryFrom`, which is the
//! only place a stored value is checked against the model's ranges.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use planboard_store::{EditorRow, JobRow, PLAN_PRO};
use serde::{Deserialize, Serialize};

use crate::PlannerError;

/// Days in a planning week. Day indices run `0..DAYS_PER_WEEK`, Monday first.
pub const DAYS_PER_WEEK: u8 = 7;

/// Job priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(PlannerError::Schema(format!("unknown priority: {other}"))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job workflow status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Queued,
    InProgress,
    Review,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in-progress",
            Self::Review => "review",
        }
    }
}

impl FromStr for Status {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "in-progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            other => Err(PlannerError::Schema(format!("unknown status: {other}"))),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entitlement tier of the signed-in user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
}

impl PlanTier {
    pub const FREE_EDITOR_LIMIT: usize = 2;
    pub const PRO_EDITOR_LIMIT: usize = 10;

    /// Map a stored `plan_type`. Anything other than pro is free.
    pub fn from_plan_type(plan_type: &str) -> Self {
        if plan_type == PLAN_PRO {
            Self::Pro
        } else {
            Self::Free
        }
    }

    /// Maximum number of editors.
    pub fn editor_limit(&self) -> usize {
        match self {
            Self::Free => Self::FREE_EDITOR_LIMIT,
            Self::Pro => Self::PRO_EDITOR_LIMIT,
        }
    }

    /// Whether the workload balancer is available.
    pub fn can_optimize(&self) -> bool {
        matches!(self, Self::Pro)
    }
}

/// A person who performs jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Editor {
    pub id: String,
    pub name: String,
    /// Hours available per week.
    pub weekly_capacity: f64,
}

impl Editor {
    pub(crate) fn to_row(&self, owner: &str) -> EditorRow {
        EditorRow {
            id: self.id.clone(),
            user_id: owner.to_string(),
            name: self.name.clone(),
            weekly_capacity: self.weekly_capacity,
            created_at: Some(Utc::now()),
        }
    }
}

impl TryFrom<EditorRow> for Editor {
    type Error = PlannerError;

    fn try_from(row: EditorRow) -> Result<Self, Self::Error> {
        if !is_positive(row.weekly_capacity) {
            return Err(PlannerError::Schema(format!(
                "editor {}: weekly capacity must be positive, got {}",
                row.id, row.weekly_capacity
            )));
        }
        Ok(Self {
            id: row.id,
            name: row.name,
            weekly_capacity: row.weekly_capacity,
        })
    }
}

/// A unit of editing work scheduled into one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub client_name: String,
    pub editor_id: String,
    /// Day index within the week, Monday = 0.
    pub scheduled_date: u8,
    /// Monday of the job's week.
    pub week_start: NaiveDate,
    pub estimated_hours: f64,
    pub priority: Priority,
    pub status: Status,
    /// Position within the cell.
    pub order: u32,
    /// Free-form note, empty when absent.
    pub notes: String,
}

impl Job {
    /// Calendar date the job is scheduled on.
    pub fn date(&self) -> NaiveDate {
        self.week_start + Duration::days(i64::from(self.scheduled_date))
    }

    /// Row for insertion. Notes travel separately through the note store.
    pub(crate) fn to_row(&self, owner: &str) -> JobRow {
        JobRow {
            id: self.id.clone(),
            user_id: owner.to_string(),
            editor_id: self.editor_id.clone(),
            title: self.title.clone(),
            client_name: self.client_name.clone(),
            scheduled_date: i64::from(self.scheduled_date),
            week_start: self.week_start,
            estimated_hours: self.estimated_hours,
            priority: self.priority.as_str().to_string(),
            status: self.status.as_str().to_string(),
            order: i64::from(self.order),
            notes: None,
            created_at: Some(Utc::now()),
        }
    }
}

impl TryFrom<JobRow> for Job {
    type Error = PlannerError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let scheduled_date = u8::try_from(row.scheduled_date)
            .ok()
            .filter(|day| *day < DAYS_PER_WEEK)
            .ok_or_else(|| {
                PlannerError::Schema(format!(
                    "job {}: scheduled day {} outside 0..7",
                    row.id, row.scheduled_date
                ))
            })?;
        if !is_valid_hours(row.estimated_hours) {
            return Err(PlannerError::Schema(format!(
                "job {}: estimated hours must be finite and non-negative, got {}",
                row.id, row.estimated_hours
            )));
        }
        let order = u32::try_from(row.order).map_err(|_| {
            PlannerError::Schema(format!("job {}: negative order {}", row.id, row.order))
        })?;
        let priority = row.priority.parse()?;
        let status = row.status.parse()?;

        Ok(Self {
            id: row.id,
            title: row.title,
            client_name: row.client_name,
            editor_id: row.editor_id,
            scheduled_date,
            week_start: monday_of(row.week_start),
            estimated_hours: row.estimated_hours,
            priority,
            status,
            order,
            notes: row.notes.unwrap_or_default(),
        })
    }
}

/// Input for adding a job to the current week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewJob {
    pub title: String,
    pub client_name: String,
    pub editor_id: String,
    pub scheduled_date: u8,
    pub estimated_hours: f64,
    pub priority: Priority,
    pub status: Status,
    pub notes: Option<String>,
}

impl NewJob {
    pub fn new(
        title: impl Into<String>,
        editor_id: impl Into<String>,
        scheduled_date: u8,
        estimated_hours: f64,
    ) -> Self {
        Self {
            title: title.into(),
            editor_id: editor_id.into(),
            scheduled_date,
            estimated_hours,
            ..Default::default()
        }
    }

    pub fn with_client(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), PlannerError> {
        validate_title(&self.title)?;
        validate_day(self.scheduled_date)?;
        validate_hours(self.estimated_hours)
    }
}

/// Partial job update. Unset fields are left untouched.
///
/// Position within the cell is not part of an update; use
/// [`Planner::move_job`](crate::Planner::move_job) to reorder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub client_name: Option<String>,
    pub editor_id: Option<String>,
    pub scheduled_date: Option<u8>,
    pub week_start: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub notes: Option<String>,
}

impl JobUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn validate(&self) -> Result<(), PlannerError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(day) = self.scheduled_date {
            validate_day(day)?;
        }
        if let Some(hours) = self.estimated_hours {
            validate_hours(hours)?;
        }
        Ok(())
    }
}

/// Input for adding an editor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEditor {
    pub name: String,
    pub weekly_capacity: f64,
}

impl NewEditor {
    pub fn new(name: impl Into<String>, weekly_capacity: f64) -> Self {
        Self {
            name: name.into(),
            weekly_capacity,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PlannerError> {
        validate_name(&self.name)?;
        validate_capacity(self.weekly_capacity)
    }
}

/// Partial editor update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorUpdate {
    pub name: Option<String>,
    pub weekly_capacity: Option<f64>,
}

impl EditorUpdate {
    pub(crate) fn validate(&self) -> Result<(), PlannerError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(capacity) = self.weekly_capacity {
            validate_capacity(capacity)?;
        }
        Ok(())
    }
}

/// Monday on or before `date`.
pub(crate) fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn is_valid_hours(hours: f64) -> bool {
    hours.is_finite() && hours >= 0.0
}

fn validate_title(title: &str) -> Result<(), PlannerError> {
    if title.trim().is_empty() {
        return Err(PlannerError::Validation("job title is required".into()));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), PlannerError> {
    if name.trim().is_empty() {
        return Err(PlannerError::Validation("editor name is required".into()));
    }
    Ok(())
}

pub(crate) fn validate_day(day: u8) -> Result<(), PlannerError> {
    if day >= DAYS_PER_WEEK {
        return Err(PlannerError::Validation(format!(
            "day {day} outside 0..{DAYS_PER_WEEK}"
        )));
    }
    Ok(())
}

fn validate_hours(hours: f64) -> Result<(), PlannerError> {
    if !is_valid_hours(hours) {
        return Err(PlannerError::Validation(format!(
            "estimated hours must be finite and non-negative, got {hours}"
        )));
    }
    Ok(())
}

fn validate_capacity(capacity: f64) -> Result<(), PlannerError> {
    if !is_positive(capacity) {
        return Err(PlannerError::Validation(format!(
            "weekly capacity must be positive, got {capacity}"
        )));
    }
    Ok(())
}
