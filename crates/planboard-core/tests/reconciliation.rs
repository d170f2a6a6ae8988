//! Optimistic updates and their rollback when the store disagrees.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{cell_ids, job_row, loaded, planner, store_with};
use planboard_core::{Collection, EditorUpdate, NewJob, PlannerError, PlannerEvent};
use planboard_store::{EDITORS_TABLE, JOBS_TABLE, MemoryStore, StaticSession};
use pretty_assertions::assert_eq;

async fn two_editors_two_jobs() -> Arc<MemoryStore> {
    store_with(
        "pro",
        &["ed-a", "ed-b"],
        &[
            job_row("job-1", "ed-a", 0, 0, 3.0),
            job_row("job-2", "ed-a", 0, 1, 2.0),
        ],
    )
    .await
}

#[tokio::test]
async fn test_confirmed_move_reaches_store() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;

    planner.move_job("job-1", "ed-b", 0, 0).unwrap();
    let summary = planner.settle().await;

    assert_eq!(summary.confirmed, 1);
    assert_eq!(summary.failed, 0);
    let moved = store.job("job-1").await.unwrap();
    assert_eq!(moved.editor_id, "ed-b");
    assert_eq!(moved.order, 0);
    // The sibling closed the gap in the store too.
    assert_eq!(store.job("job-2").await.unwrap().order, 0);
}

#[tokio::test]
async fn test_failed_move_is_rolled_back() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;
    let mut events = planner.subscribe();
    store.fail_next_writes(JOBS_TABLE, 1).await;

    planner.move_job("job-1", "ed-b", 0, 0).unwrap();
    assert_eq!(planner.job("job-1").unwrap().editor_id, "ed-b");
    assert_eq!(cell_ids(&planner, "ed-a", 0), vec!["job-2"]);

    let summary = planner.settle().await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.reconciled, vec![Collection::Jobs]);
    assert_eq!(planner.job("job-1").unwrap().editor_id, "ed-a");
    assert_eq!(cell_ids(&planner, "ed-a", 0), vec!["job-1", "job-2"]);
    assert!(cell_ids(&planner, "ed-b", 0).is_empty());

    match events.recv().await.unwrap() {
        PlannerEvent::WriteFailed { operation, .. } => assert_eq!(operation, "move job"),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(
        events.recv().await.unwrap(),
        PlannerEvent::Reconciled {
            collection: Collection::Jobs
        }
    );
}

#[tokio::test]
async fn test_write_failure_is_announced_before_settling() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;
    let mut events = planner.subscribe();
    store.fail_next_writes(JOBS_TABLE, 1).await;

    planner.delete_job("job-2").unwrap();

    match events.recv().await.unwrap() {
        PlannerEvent::WriteFailed { operation, .. } => assert_eq!(operation, "delete job"),
        other => panic!("unexpected event: {other:?}"),
    }
    // Rollback still waits for the outcome to be processed.
    assert!(planner.job("job-2").is_none());
    let summary = planner.settle().await;
    assert_eq!(summary.reconciled, vec![Collection::Jobs]);
    assert!(planner.job("job-2").is_some());
}

#[tokio::test]
async fn test_move_failing_partway_leaves_contiguous_cells() {
    let store = store_with(
        "pro",
        &["ed-a", "ed-b"],
        &[
            job_row("job-1", "ed-a", 0, 0, 3.0),
            job_row("job-2", "ed-a", 0, 1, 2.0),
            job_row("job-x", "ed-b", 0, 0, 1.0),
        ],
    )
    .await;
    let mut planner = loaded(&store).await;
    // The moved job lands, the first sibling shift is rejected.
    store.fail_writes_after(JOBS_TABLE, 1, 1).await;

    planner.move_job("job-1", "ed-b", 0, 0).unwrap();
    let summary = planner.settle().await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.reconciled, vec![Collection::Jobs]);
    assert_eq!(cell_ids(&planner, "ed-a", 0), vec!["job-2"]);
    assert_eq!(cell_ids(&planner, "ed-b", 0), vec!["job-1", "job-x"]);
    assert!(planboard_core::cells::all_cells_contiguous(planner.jobs()));
    assert_eq!(planner.pending_writes(), 1);

    let summary = planner.settle().await;
    assert_eq!(summary.confirmed, 1);
    assert_eq!(store.job("job-2").await.unwrap().order, 0);
    assert_eq!(store.job("job-1").await.unwrap().order, 0);
    assert_eq!(store.job("job-x").await.unwrap().order, 1);

    let added = planner.add_job(NewJob::new("Promo", "ed-a", 0, 1.0)).unwrap();
    assert_eq!(added.order, 1);
    assert!(planboard_core::cells::all_cells_contiguous(planner.jobs()));
}

#[tokio::test]
async fn test_load_repairs_stored_order_gaps() {
    let store = store_with(
        "free",
        &["ed-a"],
        &[
            job_row("job-1", "ed-a", 0, 0, 1.0),
            job_row("job-2", "ed-a", 0, 3, 1.0),
        ],
    )
    .await;

    let mut planner = loaded(&store).await;

    assert_eq!(planner.job("job-2").unwrap().order, 1);
    assert_eq!(planner.pending_writes(), 1);
    planner.settle().await;
    assert_eq!(store.job("job-2").await.unwrap().order, 1);
    assert_eq!(store.job("job-1").await.unwrap().order, 0);
}

#[tokio::test]
async fn test_failed_add_disappears_after_reconcile() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;
    store.fail_next_writes(JOBS_TABLE, 1).await;

    let job = planner.add_job(NewJob::new("Promo", "ed-b", 2, 4.0)).unwrap();
    assert!(planner.job(&job.id).is_some());

    planner.settle().await;

    assert!(planner.job(&job.id).is_none());
    assert_eq!(planner.jobs().len(), 2);
}

#[tokio::test]
async fn test_failed_editor_update_restores_editor() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;
    store.fail_next_writes(EDITORS_TABLE, 1).await;

    planner
        .update_editor(
            "ed-a",
            EditorUpdate {
                weekly_capacity: Some(10.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(planner.editor_capacity("ed-a"), 50);

    let summary = planner.settle().await;

    assert_eq!(summary.reconciled, vec![Collection::Editors]);
    assert_eq!(planner.editor("ed-a").unwrap().weekly_capacity, 40.0);
    assert_eq!(planner.editor_capacity("ed-a"), 13);
}

#[tokio::test]
async fn test_reconcile_failure_is_reported() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;
    let mut events = planner.subscribe();
    store.fail_next_writes(EDITORS_TABLE, 1).await;
    store.fail_next_reads(EDITORS_TABLE, 1).await;

    planner
        .update_editor(
            "ed-b",
            EditorUpdate {
                name: Some("Bea".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    let summary = planner.settle().await;

    assert_eq!(summary.failed, 1);
    assert!(summary.reconciled.is_empty());
    assert!(matches!(
        events.recv().await.unwrap(),
        PlannerEvent::WriteFailed { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        PlannerEvent::ReconcileFailed {
            collection: Collection::Editors,
            ..
        }
    ));
}

#[tokio::test]
async fn test_shutdown_cancels_pending_writes() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;
    store.set_write_delay(Some(Duration::from_secs(60))).await;

    let job = planner.add_job(NewJob::new("Late", "ed-a", 4, 1.0)).unwrap();
    assert_eq!(planner.pending_writes(), 1);
    planner.shutdown();
    let summary = planner.settle().await;

    assert_eq!(summary.failed, 1);
    assert!(store.job(&job.id).await.is_none());
    assert!(planner.job(&job.id).is_none());
}

#[tokio::test]
async fn test_sync_pending_collects_finished_writes() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;

    planner.delete_job("job-1").unwrap();
    while planner.pending_writes() > 0 {
        let summary = planner.sync_pending().await;
        if summary.confirmed > 0 {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert!(store.job("job-1").await.is_none());
    assert_eq!(store.job("job-2").await.unwrap().order, 0);
}

#[tokio::test]
async fn test_load_failure_clears_state() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;
    let mut events = planner.subscribe();
    store.fail_next_reads(JOBS_TABLE, 1).await;

    let result = planner.load().await;

    assert!(matches!(result, Err(PlannerError::RemoteRead(_))));
    assert!(planner.editors().is_empty());
    assert!(planner.jobs().is_empty());
    assert!(matches!(
        events.recv().await.unwrap(),
        PlannerEvent::LoadFailed { .. }
    ));
}

#[tokio::test]
async fn test_invalid_rows_are_skipped() {
    let mut bad = job_row("job-bad", "ed-a", 9, 0, 1.0);
    bad.priority = "urgent".to_string();
    let store = store_with("free", &["ed-a"], &[job_row("job-1", "ed-a", 0, 0, 1.0), bad]).await;

    let planner = loaded(&store).await;

    assert_eq!(planner.jobs().len(), 1);
    assert_eq!(planner.jobs()[0].id, "job-1");
}

#[tokio::test]
async fn test_validation_errors_change_nothing() {
    let store = two_editors_two_jobs().await;
    let mut planner = loaded(&store).await;
    let before = planner.jobs().to_vec();

    assert!(matches!(
        planner.move_job("job-1", "ed-a", 0, 5),
        Err(PlannerError::Validation(_))
    ));
    assert!(matches!(
        planner.move_job("job-1", "ed-z", 0, 0),
        Err(PlannerError::EditorNotFound(_))
    ));
    assert!(matches!(
        planner.add_job(NewJob::new("", "ed-a", 0, 1.0)),
        Err(PlannerError::Validation(_))
    ));
    assert!(matches!(
        planner.delete_job("missing"),
        Err(PlannerError::JobNotFound(_))
    ));

    assert_eq!(planner.jobs(), before.as_slice());
    assert_eq!(planner.pending_writes(), 0);
}

#[tokio::test]
async fn test_signed_out_planner_refuses_mutations() {
    let store = two_editors_two_jobs().await;
    let mut planner = planboard_core::Planner::new(
        store.clone(),
        Arc::new(StaticSession::anonymous()),
        Default::default(),
    );

    planner.load().await.unwrap();

    assert!(planner.editors().is_empty());
    assert!(matches!(
        planner.add_job(NewJob::new("Cut", "ed-a", 0, 1.0)),
        Err(PlannerError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_same_position_move_writes_nothing() {
    let store = two_editors_two_jobs().await;
    let mut planner = planner(&store);
    planner.load().await.unwrap();

    planner.move_job("job-2", "ed-a", 0, 1).unwrap();

    assert_eq!(planner.pending_writes(), 0);
}
