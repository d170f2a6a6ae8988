//! Read accessors and week navigation.

mod common;

use chrono::NaiveDate;
use common::{job_row, loaded, monday, store_with};
use planboard_core::{JobUpdate, NewJob};
use pretty_assertions::assert_eq;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_counts_and_capacity() {
    let mut other_week = job_row("later", "ed-a", 2, 0, 8.0);
    other_week.week_start = date(2025, 1, 27);
    let store = store_with(
        "free",
        &["ed-a", "ed-b"],
        &[
            job_row("a-1", "ed-a", 0, 0, 6.0),
            job_row("a-2", "ed-a", 0, 1, 4.0),
            job_row("b-1", "ed-b", 0, 0, 2.0),
            other_week,
        ],
    )
    .await;
    let planner = loaded(&store).await;

    assert_eq!(planner.editor_capacity("ed-a"), 25);
    assert_eq!(planner.editor_capacity("ed-b"), 5);
    assert_eq!(planner.editor_job_count("ed-a"), 3);
    assert_eq!(planner.current_week_job_count(), 3);
    assert_eq!(planner.job_count_for_date(monday()), 3);
    assert_eq!(planner.job_count_for_date(date(2025, 1, 29)), 1);

    let ids: Vec<&str> = planner
        .editor_jobs("ed-a")
        .iter()
        .map(|job| job.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a-1", "a-2"]);
}

#[tokio::test]
async fn test_jobs_for_month_spans_weeks() {
    let mut february = job_row("feb", "ed-a", 6, 0, 1.0);
    february.week_start = date(2025, 1, 27);
    let mut january = job_row("jan", "ed-a", 4, 0, 1.0);
    january.week_start = date(2025, 1, 27);
    let store = store_with(
        "free",
        &["ed-a"],
        &[job_row("early", "ed-a", 0, 0, 1.0), february, january],
    )
    .await;
    let planner = loaded(&store).await;

    let ids: Vec<&str> = planner
        .jobs_for_month(2025, 1)
        .iter()
        .map(|job| job.id.as_str())
        .collect();
    assert_eq!(ids, vec!["early", "jan"]);
    assert_eq!(planner.jobs_for_month(2025, 2).len(), 1);
}

#[tokio::test]
async fn test_week_navigation() {
    let store = store_with("free", &["ed-a"], &[]).await;
    let mut planner = loaded(&store).await;

    assert_eq!(planner.week_label(), "Week of Jan 6–12, 2025");
    assert_eq!(planner.week_dates()[0], monday());

    planner.next_week();
    planner.next_week();
    planner.next_week();
    assert_eq!(planner.week_label(), "Week of Jan 27 – Feb 2, 2025");

    planner.previous_week();
    assert_eq!(planner.week().start(), date(2025, 1, 20));

    planner.go_to_week(date(2025, 3, 13));
    assert_eq!(planner.week().start(), date(2025, 3, 10));
}

#[tokio::test]
async fn test_add_job_lands_in_current_week() {
    let store = store_with("free", &["ed-a"], &[job_row("a-1", "ed-a", 1, 0, 1.0)]).await;
    let mut planner = loaded(&store).await;

    let first = planner.add_job(NewJob::new("Cut", "ed-a", 1, 2.0)).unwrap();
    planner.next_week();
    let second = planner.add_job(NewJob::new("Grade", "ed-a", 1, 2.0)).unwrap();
    planner.settle().await;

    assert_eq!(first.order, 1);
    assert_eq!(first.week_start, monday());
    assert_eq!(second.order, 0);
    assert_eq!(second.week_start, date(2025, 1, 13));
    assert_eq!(store.jobs().await.len(), 3);
}

#[tokio::test]
async fn test_update_job_to_new_day_appends() {
    let store = store_with(
        "free",
        &["ed-a"],
        &[
            job_row("a-1", "ed-a", 0, 0, 1.0),
            job_row("a-2", "ed-a", 0, 1, 1.0),
            job_row("a-3", "ed-a", 2, 0, 1.0),
        ],
    )
    .await;
    let mut planner = loaded(&store).await;

    planner
        .update_job(
            "a-1",
            JobUpdate {
                scheduled_date: Some(2),
                title: Some("Rough cut".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    planner.settle().await;

    let fresh = loaded(&store).await;
    let moved = fresh.job("a-1").unwrap();
    assert_eq!(moved.scheduled_date, 2);
    assert_eq!(moved.order, 1);
    assert_eq!(moved.title, "Rough cut");
    assert_eq!(fresh.job("a-2").unwrap().order, 0);
}
