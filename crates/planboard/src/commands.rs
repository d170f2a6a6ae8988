//! Subcommand implementations.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;
use miette::Result;
use planboard_core::{DAYS_PER_WEEK, Planner, PlannerConfig, PlannerEvent};
use planboard_store::RestStore;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Where and as whom to connect.
pub struct Connection {
    pub url: String,
    pub api_key: String,
    pub email: String,
    pub password: String,
}

/// Log in and load a planner positioned on the week containing `date`.
async fn open(connection: &Connection, date: Option<NaiveDate>) -> Result<Planner> {
    let store = Arc::new(
        RestStore::new(&connection.url, &connection.api_key)
            .map_err(|e| miette::miette!("failed to create store client: {}", e))?,
    );
    store
        .login(&connection.email, &connection.password)
        .await
        .map_err(|e| miette::miette!("login failed: {}", e))?;
    info!(url = %store.base_url(), "logged in");

    let mut planner = Planner::new(store.clone(), store, PlannerConfig::default());
    if let Some(date) = date {
        planner.go_to_week(date);
    }
    planner
        .load()
        .await
        .map_err(|e| miette::miette!("{}", e))?;
    Ok(planner)
}

/// Wait for pending writes and fail if any was rolled back.
///
/// `events` must be subscribed before the changes were made, since write
/// failures are announced as they happen.
async fn finish(
    planner: &mut Planner,
    mut events: broadcast::Receiver<PlannerEvent>,
) -> Result<()> {
    let summary = planner.settle().await;
    while let Ok(event) = events.try_recv() {
        match event {
            PlannerEvent::WriteFailed { operation, error } => {
                warn!(operation = %operation, error = %error, "change was not saved");
            }
            PlannerEvent::NoteSaveFailed { job_id, error } => {
                warn!(job_id = %job_id, error = %error, "note was not saved");
            }
            _ => {}
        }
    }
    if summary.failed > 0 {
        return Err(miette::miette!(
            "{} change(s) could not be saved and were rolled back",
            summary.failed
        ));
    }
    Ok(())
}

pub async fn week(connection: &Connection, date: Option<NaiveDate>) -> Result<()> {
    let planner = open(connection, date).await?;
    print!("{}", render_week(&planner));
    Ok(())
}

pub async fn optimize(connection: &Connection, date: Option<NaiveDate>) -> Result<()> {
    let mut planner = open(connection, date).await?;
    if !planner.tier().can_optimize() {
        return Err(miette::miette!(
            "workload balancing requires the pro plan"
        ));
    }

    let events = planner.subscribe();
    let moves = planner
        .optimize_week_schedule()
        .map_err(|e| miette::miette!("{}", e))?;
    finish(&mut planner, events).await?;

    if moves.is_empty() {
        println!("{}: already balanced", planner.week_label());
    } else {
        println!("{}: {} job(s) reassigned", planner.week_label(), moves.len());
        for m in &moves {
            println!(
                "  day {} {} ({}h): {} -> {}",
                m.day, m.job_id, m.hours, m.from_editor, m.to_editor
            );
        }
    }
    Ok(())
}

pub async fn move_job(
    connection: &Connection,
    job_id: &str,
    editor_id: &str,
    day: u8,
    order: u32,
) -> Result<()> {
    let mut planner = open(connection, None).await?;
    let events = planner.subscribe();
    planner
        .move_job(job_id, editor_id, day, order)
        .map_err(|e| miette::miette!("{}", e))?;
    finish(&mut planner, events).await?;
    println!("moved {job_id} to {editor_id}, day {day}, position {order}");
    Ok(())
}

/// Plain-text grid of the planner's current week.
pub fn render_week(planner: &Planner) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} jobs, {} plan)",
        planner.week_label(),
        planner.current_week_job_count(),
        match planner.tier() {
            planboard_core::PlanTier::Free => "free",
            planboard_core::PlanTier::Pro => "pro",
        }
    );
    let dates = planner.week_dates();
    for editor in planner.editors() {
        let _ = writeln!(
            out,
            "\n{} [{}%]",
            editor.name,
            planner.editor_capacity(&editor.id)
        );
        for day in 0..DAYS_PER_WEEK {
            let jobs = planner.cell_jobs(&editor.id, day);
            if jobs.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {}", dates[day as usize].format("%a %b %-d"));
            for job in jobs {
                let _ = writeln!(
                    out,
                    "    {}. {} ({}h, {}, {}) [{}]",
                    job.order + 1,
                    job.title,
                    job.estimated_hours,
                    job.priority,
                    job.status,
                    job.id
                );
            }
        }
    }
    out
}
