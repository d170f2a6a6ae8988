//! Shared fixtures for planner integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use planboard_core::{Planner, PlannerConfig};
use planboard_store::{EditorRow, JobRow, MemoryStore, RecordStore, StaticSession};

pub const USER: &str = "user-1";

/// Monday of the week every fixture lives in.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

fn created(seq: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, seq).unwrap()
}

pub fn editor_row(id: &str, seq: u32) -> EditorRow {
    EditorRow {
        id: id.to_string(),
        user_id: USER.to_string(),
        name: id.to_uppercase(),
        weekly_capacity: 40.0,
        created_at: Some(created(seq)),
    }
}

pub fn job_row(id: &str, editor: &str, day: i64, order: i64, hours: f64) -> JobRow {
    JobRow {
        id: id.to_string(),
        user_id: USER.to_string(),
        editor_id: editor.to_string(),
        title: format!("Job {id}"),
        client_name: "Acme".to_string(),
        scheduled_date: day,
        week_start: monday(),
        estimated_hours: hours,
        priority: "medium".to_string(),
        status: "queued".to_string(),
        order,
        notes: None,
        created_at: None,
    }
}

/// A store with the given editors and jobs on `plan_type`.
pub async fn store_with(plan_type: &str, editors: &[&str], jobs: &[JobRow]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set_plan(USER, plan_type).await;
    for (seq, id) in editors.iter().enumerate() {
        store.insert_editor(&editor_row(id, seq as u32)).await.unwrap();
    }
    for row in jobs {
        store.insert_job(row).await.unwrap();
    }
    store
}

/// A planner signed in as [`USER`], positioned on [`monday`], not loaded.
pub fn planner(store: &Arc<MemoryStore>) -> Planner {
    Planner::new(
        store.clone(),
        Arc::new(StaticSession::new(USER)),
        PlannerConfig::default(),
    )
    .with_week(monday())
}

/// A loaded planner over `store`.
pub async fn loaded(store: &Arc<MemoryStore>) -> Planner {
    let mut planner = planner(store);
    planner.load().await.unwrap();
    planner
}

/// Ids of one cell of the current week, in order.
pub fn cell_ids(planner: &Planner, editor: &str, day: u8) -> Vec<String> {
    planner
        .cell_jobs(editor, day)
        .iter()
        .map(|job| job.id.clone())
        .collect()
}
