//! The planner state container.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use planboard_store::{EditorPatch, JobPatch, RecordStore, SessionProvider};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::balancer::{self, Reassignment};
use crate::capacity;
use crate::cells::{self, CellKey};
use crate::notes;
use crate::sync::{Mutation, StoreWrite, Synchronizer, WriteFailure, WriteOutcome};
use crate::types::{DAYS_PER_WEEK, monday_of};
use crate::{
    Collection, Editor, EditorUpdate, Job, JobUpdate, NewEditor, NewJob, PlanTier, PlannerConfig,
    PlannerError, PlannerEvent, WeekWindow,
};

/// What a round of outcome processing did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    /// Mutations the store acknowledged.
    pub confirmed: usize,
    /// Mutations that failed, including note failures.
    pub failed: usize,
    /// Collections successfully replaced with a fresh read.
    pub reconciled: Vec<Collection>,
}

/// Owns the editors and jobs of the signed-in user and keeps them in step
/// with the store.
///
/// Every mutating operation validates, changes local state and returns;
/// the durable write runs in the background. Call [`Planner::sync_pending`]
/// or [`Planner::settle`] to process write outcomes. A failed write rolls
/// the affected collection back to the store's state.
///
/// Mutating operations spawn tasks and must run inside a tokio runtime.
pub struct Planner {
    store: Arc<dyn RecordStore>,
    session: Arc<dyn SessionProvider>,
    config: PlannerConfig,
    user_id: Option<String>,
    tier: PlanTier,
    week: WeekWindow,
    editors: Vec<Editor>,
    jobs: Vec<Job>,
    sync: Synchronizer,
    events: broadcast::Sender<PlannerEvent>,
}

impl Planner {
    /// Create an empty planner positioned on the current week.
    pub fn new(
        store: Arc<dyn RecordStore>,
        session: Arc<dyn SessionProvider>,
        config: PlannerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            sync: Synchronizer::new(Arc::clone(&store)).with_events(events.clone()),
            store,
            session,
            config,
            user_id: None,
            tier: PlanTier::Free,
            week: WeekWindow::current(),
            editors: Vec::new(),
            jobs: Vec::new(),
            events,
        }
    }

    /// Position the planner on the week containing `date`.
    pub fn with_week(mut self, date: NaiveDate) -> Self {
        self.week = WeekWindow::containing(date);
        self
    }

    /// Subscribe to planner events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlannerEvent> {
        self.events.subscribe()
    }

    pub fn editors(&self) -> &[Editor] {
        &self.editors
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn editor(&self, id: &str) -> Option<&Editor> {
        self.editors.iter().find(|editor| editor.id == id)
    }

    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn tier(&self) -> PlanTier {
        self.tier
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Mutations submitted whose outcome has not been processed yet.
    pub fn pending_writes(&self) -> usize {
        self.sync.in_flight()
    }

    // ----- Loading -----

    /// Fetch editors, jobs, notes and the entitlement tier of the signed-in
    /// user.
    ///
    /// With no signed-in user the planner is emptied and nothing is fetched.
    /// A failed read clears both collections.
    #[tracing::instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), PlannerError> {
        self.user_id = self.session.current_user().await;
        let Some(owner) = self.user_id.clone() else {
            debug!("no signed-in user, nothing to load");
            self.editors.clear();
            self.jobs.clear();
            self.tier = PlanTier::Free;
            return Ok(());
        };

        self.refresh_tier(&owner).await;
        let (editors, jobs) = tokio::join!(self.fetch_editors(&owner), self.fetch_jobs(&owner));
        match editors.and_then(|editors| jobs.map(|jobs| (editors, jobs))) {
            Ok((editors, jobs)) => {
                info!(
                    editors = editors.len(),
                    jobs = jobs.len(),
                    tier = ?self.tier,
                    "loaded planner data"
                );
                self.emit(PlannerEvent::Loaded {
                    editors: editors.len(),
                    jobs: jobs.len(),
                });
                self.editors = editors;
                self.adopt_jobs(jobs);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to load planner data");
                self.editors.clear();
                self.jobs.clear();
                self.emit(PlannerEvent::LoadFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn refresh_tier(&mut self, owner: &str) {
        match self.store.get_profile(owner).await {
            Ok(Some(profile)) => self.tier = PlanTier::from_plan_type(&profile.plan_type),
            Ok(None) => self.tier = PlanTier::Free,
            Err(e) => warn!(error = %e, tier = ?self.tier, "failed to read plan, keeping cached tier"),
        }
    }

    async fn fetch_editors(&self, owner: &str) -> Result<Vec<Editor>, PlannerError> {
        let rows = self
            .store
            .list_editors(owner)
            .await
            .map_err(PlannerError::RemoteRead)?;
        Ok(admit(rows, "editor"))
    }

    async fn fetch_jobs(&self, owner: &str) -> Result<Vec<Job>, PlannerError> {
        let rows = self
            .store
            .list_jobs(owner)
            .await
            .map_err(PlannerError::RemoteRead)?;
        let dedicated = notes::load_notes(self.store.as_ref(), owner).await;
        let mut jobs: Vec<Job> = admit(rows, "job");
        for job in &mut jobs {
            job.notes = notes::resolve_note(
                dedicated.get(&job.id).map(String::as_str),
                Some(job.notes.as_str()),
            );
        }
        Ok(jobs)
    }

    // ----- Jobs -----

    /// Add a job to the end of its cell in the current week.
    #[tracing::instrument(skip(self, new), fields(title = %new.title, editor_id = %new.editor_id))]
    pub fn add_job(&mut self, new: NewJob) -> Result<Job, PlannerError> {
        let owner = self.owner()?;
        new.validate()?;
        self.require_editor(&new.editor_id)?;

        let key = CellKey::new(new.editor_id.clone(), new.scheduled_date, self.week.start());
        let job = Job {
            id: Uuid::new_v4().to_string(),
            order: cells::next_order(&self.jobs, &key),
            title: new.title,
            client_name: new.client_name,
            editor_id: new.editor_id,
            scheduled_date: new.scheduled_date,
            week_start: self.week.start(),
            estimated_hours: new.estimated_hours,
            priority: new.priority,
            status: new.status,
            notes: new.notes.unwrap_or_default(),
        };

        let mut mutation =
            Mutation::new("add job", Collection::Jobs).with(StoreWrite::InsertJob(job.to_row(&owner)));
        if !job.notes.is_empty() {
            mutation.push(StoreWrite::SaveNote {
                owner,
                job_id: job.id.clone(),
                content: job.notes.clone(),
            });
        }
        self.jobs.push(job.clone());
        self.sync.submit(mutation);

        info!(job_id = %job.id, order = job.order, "added job");
        Ok(job)
    }

    /// Update fields of a job.
    ///
    /// Changing the editor, day or week appends the job to the end of its
    /// new cell and closes the gap in the old one.
    #[tracing::instrument(skip(self, update))]
    pub fn update_job(&mut self, job_id: &str, update: JobUpdate) -> Result<(), PlannerError> {
        let owner = self.owner()?;
        update.validate()?;
        if let Some(editor_id) = &update.editor_id {
            self.require_editor(editor_id)?;
        }
        let index = self.job_index(job_id)?;

        let current = CellKey::of(&self.jobs[index]);
        let target = CellKey::new(
            update
                .editor_id
                .clone()
                .unwrap_or_else(|| current.editor_id.clone()),
            update.scheduled_date.unwrap_or(current.day),
            update.week_start.map(monday_of).unwrap_or(current.week_start),
        );

        let mut patch = JobPatch {
            title: update.title.clone(),
            client_name: update.client_name.clone(),
            estimated_hours: update.estimated_hours,
            priority: update.priority.map(|p| p.as_str().to_string()),
            status: update.status.map(|s| s.as_str().to_string()),
            ..Default::default()
        };
        let mut shifted = Vec::new();
        if target != current {
            let end = cells::next_order(&self.jobs, &target);
            let reorder = cells::move_job(&mut self.jobs, job_id, &target, end)?;
            patch.editor_id = Some(target.editor_id.clone());
            patch.scheduled_date = Some(i64::from(target.day));
            patch.week_start = Some(target.week_start);
            patch.order = Some(i64::from(end));
            shifted = reorder.shifted;
        }

        let job = &mut self.jobs[index];
        if let Some(title) = update.title {
            job.title = title;
        }
        if let Some(client_name) = update.client_name {
            job.client_name = client_name;
        }
        if let Some(hours) = update.estimated_hours {
            job.estimated_hours = hours;
        }
        if let Some(priority) = update.priority {
            job.priority = priority;
        }
        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(notes) = &update.notes {
            job.notes = notes.clone();
        }

        let mut mutation = Mutation::new("update job", Collection::Jobs);
        if !patch.is_empty() {
            mutation.push(StoreWrite::UpdateJob {
                id: job_id.to_string(),
                patch,
            });
        }
        mutation.writes.extend(self.order_writes(&shifted));
        if let Some(content) = update.notes {
            mutation.push(StoreWrite::SaveNote {
                owner,
                job_id: job_id.to_string(),
                content,
            });
        }
        if mutation.is_empty() {
            return Ok(());
        }
        self.sync.submit(mutation);

        info!(job_id, "updated job");
        Ok(())
    }

    /// Move a job to position `order` of another editor or day in the same
    /// week, or reorder it within its cell.
    #[tracing::instrument(skip(self))]
    pub fn move_job(
        &mut self,
        job_id: &str,
        editor_id: &str,
        day: u8,
        order: u32,
    ) -> Result<(), PlannerError> {
        self.owner()?;
        self.require_editor(editor_id)?;
        let index = self.job_index(job_id)?;

        let target = CellKey::new(editor_id, day, self.jobs[index].week_start);
        let reorder = cells::move_job(&mut self.jobs, job_id, &target, order)?;
        if reorder.is_empty() {
            debug!(job_id, "job already in place");
            return Ok(());
        }

        let patch = JobPatch {
            editor_id: Some(editor_id.to_string()),
            scheduled_date: Some(i64::from(day)),
            order: Some(i64::from(order)),
            ..Default::default()
        };
        let mut mutation = Mutation::new("move job", Collection::Jobs).with(StoreWrite::UpdateJob {
            id: job_id.to_string(),
            patch,
        });
        mutation.writes.extend(self.order_writes(&reorder.shifted));
        self.sync.submit(mutation);

        info!(job_id, editor_id, day, order, shifted = reorder.shifted.len(), "moved job");
        Ok(())
    }

    /// Delete a job and close the gap in its cell. Its note goes with it.
    #[tracing::instrument(skip(self))]
    pub fn delete_job(&mut self, job_id: &str) -> Result<(), PlannerError> {
        self.owner()?;
        let (removed, shifted) = cells::remove_job(&mut self.jobs, job_id)
            .ok_or_else(|| PlannerError::JobNotFound(job_id.to_string()))?;

        let mut mutation = Mutation::new("delete job", Collection::Jobs)
            .with(StoreWrite::DeleteJob { id: removed.id });
        mutation.writes.extend(self.order_writes(&shifted));
        self.sync.submit(mutation);

        info!(job_id, "deleted job");
        Ok(())
    }

    // ----- Editors -----

    /// Add an editor, subject to the plan's editor limit.
    ///
    /// The tier is re-read from the store first so that an upgrade takes
    /// effect without reloading.
    #[tracing::instrument(skip(self, new), fields(name = %new.name))]
    pub async fn add_editor(&mut self, new: NewEditor) -> Result<Editor, PlannerError> {
        let owner = self.owner()?;
        new.validate()?;
        self.refresh_tier(&owner).await;

        let limit = self.tier.editor_limit();
        if self.editors.len() >= limit {
            warn!(limit, tier = ?self.tier, "editor limit reached");
            return Err(PlannerError::PlanLimitExceeded { limit });
        }

        let editor = Editor {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            weekly_capacity: new.weekly_capacity,
        };
        self.editors.push(editor.clone());
        self.sync.submit(
            Mutation::new("add editor", Collection::Editors)
                .with(StoreWrite::InsertEditor(editor.to_row(&owner))),
        );

        info!(editor_id = %editor.id, "added editor");
        Ok(editor)
    }

    #[tracing::instrument(skip(self, update))]
    pub fn update_editor(&mut self, editor_id: &str, update: EditorUpdate) -> Result<(), PlannerError> {
        self.owner()?;
        update.validate()?;
        let editor = self
            .editors
            .iter_mut()
            .find(|editor| editor.id == editor_id)
            .ok_or_else(|| PlannerError::EditorNotFound(editor_id.to_string()))?;

        let patch = EditorPatch {
            name: update.name,
            weekly_capacity: update.weekly_capacity,
        };
        if patch.is_empty() {
            return Ok(());
        }
        if let Some(name) = &patch.name {
            editor.name = name.clone();
        }
        if let Some(capacity) = patch.weekly_capacity {
            editor.weekly_capacity = capacity;
        }
        self.sync.submit(
            Mutation::new("update editor", Collection::Editors).with(StoreWrite::UpdateEditor {
                id: editor_id.to_string(),
                patch,
            }),
        );

        info!(editor_id, "updated editor");
        Ok(())
    }

    /// Delete an editor.
    ///
    /// An editor with jobs in any week needs `reassign_to`; its jobs are
    /// appended to the matching cells of that editor before the delete.
    #[tracing::instrument(skip(self))]
    pub fn delete_editor(
        &mut self,
        editor_id: &str,
        reassign_to: Option<&str>,
    ) -> Result<(), PlannerError> {
        self.owner()?;
        self.require_editor(editor_id)?;

        let count = self.editor_job_count(editor_id);
        let mut mutation = Mutation::new("delete editor", Collection::Editors);
        if count > 0 {
            let Some(to) = reassign_to else {
                return Err(PlannerError::EditorHasJobs {
                    editor_id: editor_id.to_string(),
                    count,
                });
            };
            mutation.collection = Collection::All;
            let writes = self.reassign_in_memory(editor_id, to)?;
            mutation.writes.extend(writes);
        }

        self.editors.retain(|editor| editor.id != editor_id);
        mutation.push(StoreWrite::DeleteEditor {
            id: editor_id.to_string(),
        });
        self.sync.submit(mutation);

        info!(editor_id, reassigned = count, "deleted editor");
        Ok(())
    }

    /// Hand every job of `from`, across all weeks, to `to`.
    ///
    /// Returns the number of jobs reassigned.
    #[tracing::instrument(skip(self))]
    pub fn reassign_editor_jobs(&mut self, from: &str, to: &str) -> Result<usize, PlannerError> {
        self.owner()?;
        self.require_editor(from)?;

        let count = self.editor_job_count(from);
        let writes = self.reassign_in_memory(from, to)?;
        if !writes.is_empty() {
            let mut mutation = Mutation::new("reassign jobs", Collection::Jobs);
            mutation.writes = writes;
            self.sync.submit(mutation);
        }

        info!(from, to, count, "reassigned jobs");
        Ok(count)
    }

    /// Move every job of `from` to the end of the matching cell of `to`,
    /// keeping their relative order, and return the writes that persist it.
    fn reassign_in_memory(&mut self, from: &str, to: &str) -> Result<Vec<StoreWrite>, PlannerError> {
        if from == to {
            return Err(PlannerError::Validation(
                "cannot reassign jobs to the same editor".into(),
            ));
        }
        self.require_editor(to)?;

        let mut moving: Vec<(NaiveDate, u8, u32, String)> = self
            .jobs
            .iter()
            .filter(|job| job.editor_id == from)
            .map(|job| (job.week_start, job.scheduled_date, job.order, job.id.clone()))
            .collect();
        if moving.is_empty() {
            return Ok(Vec::new());
        }
        moving.sort();

        for (week_start, day, _, id) in &moving {
            let target = CellKey::new(to, *day, *week_start);
            let end = cells::next_order(&self.jobs, &target);
            cells::move_job(&mut self.jobs, id, &target, end)?;
        }

        let mut writes = vec![StoreWrite::ReassignJobs {
            from: from.to_string(),
            to: to.to_string(),
        }];
        let moved: Vec<String> = moving.into_iter().map(|(_, _, _, id)| id).collect();
        writes.extend(self.order_writes(&moved));
        Ok(writes)
    }

    // ----- Balancing -----

    /// Even out per-day load across editors for the current week.
    ///
    /// A no-op on plans without balancing. Each reassigned job is persisted
    /// as its own mutation.
    #[tracing::instrument(skip(self))]
    pub fn optimize_week_schedule(&mut self) -> Result<Vec<Reassignment>, PlannerError> {
        self.owner()?;
        if !self.tier.can_optimize() {
            info!(tier = ?self.tier, "workload balancing not available on this plan");
            return Ok(Vec::new());
        }

        let plan = balancer::balance_week(
            &self.jobs,
            &self.editors,
            self.week.start(),
            &self.config.balancer,
        );
        if plan.is_noop() {
            info!(week = %self.week, "week already balanced");
            return Ok(Vec::new());
        }

        let patches = plan.patches();
        self.jobs = plan.jobs;
        for (id, patch) in patches {
            self.sync.submit(
                Mutation::new("optimize week", Collection::Jobs)
                    .with(StoreWrite::UpdateJob { id, patch }),
            );
        }

        info!(week = %self.week, moves = plan.moves.len(), "rebalanced week");
        self.emit(PlannerEvent::Rebalanced {
            moves: plan.moves.len(),
        });
        Ok(plan.moves)
    }

    // ----- Synchronization -----

    /// Process write outcomes that are already available, without waiting.
    pub async fn sync_pending(&mut self) -> SyncSummary {
        let outcomes = self.sync.try_outcomes();
        self.process_outcomes(outcomes).await
    }

    /// Wait for every in-flight write, then process the outcomes.
    pub async fn settle(&mut self) -> SyncSummary {
        let outcomes = self.sync.wait_all().await;
        self.process_outcomes(outcomes).await
    }

    /// Cancel every in-flight write. Cancelled writes report as failed on
    /// the next [`Planner::settle`].
    pub fn shutdown(&mut self) {
        info!(in_flight = self.sync.in_flight(), "cancelling pending writes");
        self.sync.cancel_all();
    }

    async fn process_outcomes(&mut self, outcomes: Vec<WriteOutcome>) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let mut stale = BTreeSet::new();

        for outcome in outcomes {
            match outcome.result {
                Ok(()) => {
                    summary.confirmed += 1;
                    debug!(id = outcome.id, label = %outcome.label, "write confirmed");
                }
                // Failure events were already sent by the write task.
                Err(WriteFailure::Note(e)) => {
                    summary.failed += 1;
                    error!(job_id = %e.job_id, error = %e, "note save failed");
                }
                Err(failure) => {
                    summary.failed += 1;
                    error!(label = %outcome.label, error = %failure, "write failed");
                    stale.extend(outcome.collection.expand().iter().copied());
                }
            }
        }

        for collection in stale {
            if self.reconcile(collection).await.is_ok() {
                summary.reconciled.push(collection);
            }
        }
        summary
    }

    /// Replace a collection with a fresh read from the store, discarding
    /// any unconfirmed local changes to it.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&mut self, collection: Collection) -> Result<(), PlannerError> {
        let owner = self.owner()?;
        match self.refetch(collection, &owner).await {
            Ok(()) => {
                info!(%collection, "reconciled from store");
                self.emit(PlannerEvent::Reconciled { collection });
                Ok(())
            }
            Err(e) => {
                error!(%collection, error = %e, "reconciliation failed");
                self.emit(PlannerEvent::ReconcileFailed {
                    collection,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn refetch(&mut self, collection: Collection, owner: &str) -> Result<(), PlannerError> {
        for part in collection.expand() {
            match part {
                Collection::Editors => self.editors = self.fetch_editors(owner).await?,
                Collection::Jobs => {
                    let jobs = self.fetch_jobs(owner).await?;
                    self.adopt_jobs(jobs);
                }
                Collection::All => {}
            }
        }
        Ok(())
    }

    /// Take freshly read jobs. A cell whose stored orders are not `0..n`,
    /// as left behind by a mutation that failed partway, is renumbered and
    /// the repaired orders are written back.
    fn adopt_jobs(&mut self, mut jobs: Vec<Job>) {
        let repaired = cells::renumber(&mut jobs);
        self.jobs = jobs;
        if repaired.is_empty() {
            return;
        }

        warn!(jobs = repaired.len(), "stored cell orders not contiguous, repairing");
        let mut mutation = Mutation::new("repair cell order", Collection::Jobs);
        mutation.writes.extend(self.order_writes(&repaired));
        self.sync.submit(mutation);
    }

    // ----- Queries -----

    /// Jobs of an editor in the current week, by day then order.
    pub fn editor_jobs(&self, editor_id: &str) -> Vec<&Job> {
        let week_start = self.week.start();
        let mut jobs: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|job| job.editor_id == editor_id && job.week_start == week_start)
            .collect();
        jobs.sort_by_key(|job| (job.scheduled_date, job.order));
        jobs
    }

    /// Jobs of one cell in the current week, by order.
    pub fn cell_jobs(&self, editor_id: &str, day: u8) -> Vec<&Job> {
        cells::cell_jobs(&self.jobs, &CellKey::new(editor_id, day, self.week.start()))
    }

    /// Utilization of an editor in the current week, `0..=100`.
    pub fn editor_capacity(&self, editor_id: &str) -> u8 {
        capacity::capacity(
            &self.jobs,
            &self.editors,
            editor_id,
            self.week.start(),
            self.config.default_weekly_capacity,
        )
    }

    /// Jobs assigned to an editor across all weeks.
    pub fn editor_job_count(&self, editor_id: &str) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.editor_id == editor_id)
            .count()
    }

    /// Jobs scheduled on a calendar date, any editor.
    pub fn job_count_for_date(&self, date: NaiveDate) -> usize {
        self.jobs.iter().filter(|job| job.date() == date).count()
    }

    pub fn current_week_job_count(&self) -> usize {
        let week_start = self.week.start();
        self.jobs
            .iter()
            .filter(|job| job.week_start == week_start)
            .count()
    }

    /// Jobs whose date falls in the given month (1-based), by date then order.
    pub fn jobs_for_month(&self, year: i32, month: u32) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|job| {
                let date = job.date();
                date.year() == year && date.month() == month
            })
            .collect();
        jobs.sort_by_key(|job| (job.date(), job.order));
        jobs
    }

    pub fn week(&self) -> WeekWindow {
        self.week
    }

    pub fn week_dates(&self) -> [NaiveDate; DAYS_PER_WEEK as usize] {
        self.week.dates()
    }

    pub fn week_label(&self) -> String {
        self.week.label()
    }

    pub fn previous_week(&mut self) {
        self.week = self.week.previous();
    }

    pub fn next_week(&mut self) {
        self.week = self.week.next();
    }

    /// Jump to the week containing `date`.
    pub fn go_to_week(&mut self, date: NaiveDate) {
        self.week = WeekWindow::containing(date);
    }

    // ----- Helpers -----

    fn owner(&self) -> Result<String, PlannerError> {
        self.user_id.clone().ok_or(PlannerError::NotAuthenticated)
    }

    fn require_editor(&self, editor_id: &str) -> Result<(), PlannerError> {
        if self.editor(editor_id).is_none() {
            return Err(PlannerError::EditorNotFound(editor_id.to_string()));
        }
        Ok(())
    }

    fn job_index(&self, job_id: &str) -> Result<usize, PlannerError> {
        self.jobs
            .iter()
            .position(|job| job.id == job_id)
            .ok_or_else(|| PlannerError::JobNotFound(job_id.to_string()))
    }

    /// Order-only writes for the given jobs at their current position.
    fn order_writes(&self, ids: &[String]) -> Vec<StoreWrite> {
        ids.iter()
            .filter_map(|id| self.job(id))
            .map(|job| StoreWrite::UpdateJob {
                id: job.id.clone(),
                patch: JobPatch::order(i64::from(job.order)),
            })
            .collect()
    }

    fn emit(&self, event: PlannerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Convert stored rows, skipping any that fail validation.
fn admit<R, T>(rows: Vec<R>, kind: &'static str) -> Vec<T>
where
    T: TryFrom<R, Error = PlannerError>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(kind, error = %e, "skipping invalid row");
                None
            }
        })
        .collect()
}
