//! Ordered cells.
//!
//! A cell is the set of jobs sharing an editor, a day and a week. Within a
//! cell, job orders always form the contiguous range `0..n`. Every function
//! here preserves that invariant for the cells it touches.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::PlannerError;
use crate::types::{Job, validate_day};

/// Identifies one cell of the planning grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub editor_id: String,
    pub day: u8,
    pub week_start: NaiveDate,
}

impl CellKey {
    pub fn new(editor_id: impl Into<String>, day: u8, week_start: NaiveDate) -> Self {
        Self {
            editor_id: editor_id.into(),
            day,
            week_start,
        }
    }

    /// The cell a job currently sits in.
    pub fn of(job: &Job) -> Self {
        Self::new(job.editor_id.clone(), job.scheduled_date, job.week_start)
    }

    pub fn contains(&self, job: &Job) -> bool {
        job.editor_id == self.editor_id
            && job.scheduled_date == self.day
            && job.week_start == self.week_start
    }
}

/// Order changes produced by a move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reorder {
    /// The job that was moved, unless the move was a no-op.
    pub moved: Option<String>,
    /// Siblings whose order shifted to make room or close a gap.
    pub shifted: Vec<String>,
}

impl Reorder {
    pub fn is_empty(&self) -> bool {
        self.moved.is_none() && self.shifted.is_empty()
    }
}

/// Number of jobs in the cell.
pub fn cell_size(jobs: &[Job], key: &CellKey) -> usize {
    jobs.iter().filter(|job| key.contains(job)).count()
}

/// Order a newly added job takes: the end of the cell.
pub fn next_order(jobs: &[Job], key: &CellKey) -> u32 {
    cell_size(jobs, key) as u32
}

/// Jobs of the cell sorted by order.
pub fn cell_jobs<'a>(jobs: &'a [Job], key: &CellKey) -> Vec<&'a Job> {
    let mut cell: Vec<&Job> = jobs.iter().filter(|job| key.contains(job)).collect();
    cell.sort_by_key(|job| job.order);
    cell
}

/// Whether the cell's orders are exactly `0..n`.
pub fn is_contiguous(jobs: &[Job], key: &CellKey) -> bool {
    cell_jobs(jobs, key)
        .iter()
        .enumerate()
        .all(|(i, job)| job.order as usize == i)
}

/// Whether every non-empty cell is contiguous.
pub fn all_cells_contiguous(jobs: &[Job]) -> bool {
    let keys: BTreeSet<CellKey> = jobs.iter().map(CellKey::of).collect();
    keys.iter().all(|key| is_contiguous(jobs, key))
}

/// Restore `0..n` orders in every cell, keeping the relative position of
/// jobs (ties broken by id).
///
/// Returns the ids of jobs whose order changed.
pub fn renumber(jobs: &mut [Job]) -> Vec<String> {
    let mut grid: BTreeMap<CellKey, Vec<usize>> = BTreeMap::new();
    for (index, job) in jobs.iter().enumerate() {
        grid.entry(CellKey::of(job)).or_default().push(index);
    }

    let mut changed = Vec::new();
    for indices in grid.values_mut() {
        indices.sort_by(|&a, &b| (jobs[a].order, &jobs[a].id).cmp(&(jobs[b].order, &jobs[b].id)));
        for (order, &index) in indices.iter().enumerate() {
            let order = order as u32;
            if jobs[index].order != order {
                jobs[index].order = order;
                changed.push(jobs[index].id.clone());
            }
        }
    }
    changed
}

/// Move a job to `target_order` within `target`, which may be its own cell.
///
/// `target_order` may range over `0..=size`, where size counts the target
/// cell without the moving job. Out-of-range input fails without changing
/// anything.
pub fn move_job(
    jobs: &mut [Job],
    job_id: &str,
    target: &CellKey,
    target_order: u32,
) -> Result<Reorder, PlannerError> {
    validate_day(target.day)?;
    let index = jobs
        .iter()
        .position(|job| job.id == job_id)
        .ok_or_else(|| PlannerError::JobNotFound(job_id.to_string()))?;

    let source = CellKey::of(&jobs[index]);
    let old_order = jobs[index].order;
    let size = jobs
        .iter()
        .filter(|job| job.id != job_id && target.contains(job))
        .count() as u32;
    if target_order > size {
        return Err(PlannerError::Validation(format!(
            "order {target_order} outside 0..={size} for target cell"
        )));
    }

    let mut reorder = Reorder::default();
    if source == *target {
        if target_order == old_order {
            return Ok(reorder);
        }
        for job in jobs.iter_mut() {
            if job.id == job_id || !target.contains(job) {
                continue;
            }
            if target_order > old_order && job.order > old_order && job.order <= target_order {
                job.order -= 1;
                reorder.shifted.push(job.id.clone());
            } else if target_order < old_order
                && job.order >= target_order
                && job.order < old_order
            {
                job.order += 1;
                reorder.shifted.push(job.id.clone());
            }
        }
    } else {
        for job in jobs.iter_mut() {
            if job.id == job_id {
                continue;
            }
            if source.contains(job) && job.order > old_order {
                job.order -= 1;
                reorder.shifted.push(job.id.clone());
            } else if target.contains(job) && job.order >= target_order {
                job.order += 1;
                reorder.shifted.push(job.id.clone());
            }
        }
        let job = &mut jobs[index];
        job.editor_id = target.editor_id.clone();
        job.scheduled_date = target.day;
        job.week_start = target.week_start;
    }

    jobs[index].order = target_order;
    reorder.moved = Some(job_id.to_string());
    Ok(reorder)
}

/// Remove a job and close the gap it leaves.
///
/// Returns the removed job and the ids of siblings whose order changed.
pub fn remove_job(jobs: &mut Vec<Job>, job_id: &str) -> Option<(Job, Vec<String>)> {
    let index = jobs.iter().position(|job| job.id == job_id)?;
    let removed = jobs.remove(index);
    let key = CellKey::of(&removed);
    let mut shifted = Vec::new();
    for job in jobs.iter_mut() {
        if key.contains(job) && job.order > removed.order {
            job.order -= 1;
            shifted.push(job.id.clone());
        }
    }
    Some((removed, shifted))
}
