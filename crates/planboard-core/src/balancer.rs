//! Greedy per-day workload balancing.
//!
//! For each day of a week, the balancer repeatedly takes the most loaded
//! editor and the least loaded one and moves the smallest job that narrows
//! the gap without inverting it. It works on a snapshot and reports every
//! job it touched so the caller can persist the result.

use std::collections::HashMap;

use chrono::NaiveDate;
use planboard_store::JobPatch;
use tracing::{debug, warn};

use crate::cells::{self, CellKey};
use crate::config::BalancerConfig;
use crate::types::{DAYS_PER_WEEK, Editor, Job};

/// One job handed from an overloaded editor to an underloaded one.
#[derive(Debug, Clone, PartialEq)]
pub struct Reassignment {
    pub job_id: String,
    pub day: u8,
    pub from_editor: String,
    pub to_editor: String,
    pub hours: f64,
}

/// Result of balancing a week.
#[derive(Debug, Clone, Default)]
pub struct BalancePlan {
    /// Reassignments in the order they were made.
    pub moves: Vec<Reassignment>,
    /// The full job list after balancing.
    pub jobs: Vec<Job>,
    /// Jobs whose editor or order changed, first-touched first.
    pub touched: Vec<String>,
}

impl BalancePlan {
    pub fn is_noop(&self) -> bool {
        self.moves.is_empty()
    }

    /// Column updates needed to persist the plan, one per touched job.
    ///
    /// Reassigned jobs carry their new editor and order; siblings that only
    /// closed a gap carry their order.
    pub fn patches(&self) -> Vec<(String, JobPatch)> {
        self.touched
            .iter()
            .filter_map(|id| {
                let job = self.jobs.iter().find(|job| &job.id == id)?;
                let reassigned = self.moves.iter().any(|m| &m.job_id == id);
                let patch = JobPatch {
                    editor_id: reassigned.then(|| job.editor_id.clone()),
                    order: Some(i64::from(job.order)),
                    ..Default::default()
                };
                Some((id.clone(), patch))
            })
            .collect()
    }

    fn touch(&mut self, id: &str) {
        if !self.touched.iter().any(|t| t == id) {
            self.touched.push(id.to_string());
        }
    }
}

/// Balance every day of the week starting `week_start`.
///
/// Does nothing with fewer than two editors. Loads count only jobs of known
/// editors.
pub fn balance_week(
    jobs: &[Job],
    editors: &[Editor],
    week_start: NaiveDate,
    config: &BalancerConfig,
) -> BalancePlan {
    let mut plan = BalancePlan {
        jobs: jobs.to_vec(),
        ..Default::default()
    };
    if editors.len() < 2 {
        return plan;
    }
    for day in 0..DAYS_PER_WEEK {
        balance_day(&mut plan, editors, week_start, day, config);
    }
    plan
}

fn on_day(job: &Job, week_start: NaiveDate, day: u8) -> bool {
    job.week_start == week_start && job.scheduled_date == day
}

fn balance_day(
    plan: &mut BalancePlan,
    editors: &[Editor],
    week_start: NaiveDate,
    day: u8,
    config: &BalancerConfig,
) {
    if !plan.jobs.iter().any(|job| on_day(job, week_start, day)) {
        return;
    }

    let index: HashMap<&str, usize> = editors
        .iter()
        .enumerate()
        .map(|(i, editor)| (editor.id.as_str(), i))
        .collect();
    let mut loads = vec![0.0_f64; editors.len()];
    for job in plan.jobs.iter().filter(|job| on_day(job, week_start, day)) {
        if let Some(&i) = index.get(job.editor_id.as_str()) {
            loads[i] += job.estimated_hours;
        }
    }

    let mut ranked: Vec<usize> = (0..editors.len()).collect();
    for _ in 0..config.max_iterations {
        ranked.sort_by(|&a, &b| loads[b].total_cmp(&loads[a]));
        let over = ranked[0];
        let under = ranked[ranked.len() - 1];
        if loads[over] - loads[under] <= config.threshold_hours {
            break;
        }

        let over_id = editors[over].id.as_str();
        let mut candidates: Vec<(&str, f64)> = plan
            .jobs
            .iter()
            .filter(|job| job.editor_id == over_id && on_day(job, week_start, day))
            .map(|job| (job.id.as_str(), job.estimated_hours))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        let Some((job_id, hours)) = candidates
            .into_iter()
            .find(|(_, hours)| loads[under] + hours < loads[over])
            .map(|(id, hours)| (id.to_string(), hours))
        else {
            break;
        };

        let target = CellKey::new(editors[under].id.clone(), day, week_start);
        let end = cells::next_order(&plan.jobs, &target);
        let reorder = match cells::move_job(&mut plan.jobs, &job_id, &target, end) {
            Ok(reorder) => reorder,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "balancer move rejected");
                break;
            }
        };
        plan.touch(&job_id);
        for id in &reorder.shifted {
            plan.touch(id);
        }

        debug!(
            job_id = %job_id,
            day,
            from = %editors[over].id,
            to = %editors[under].id,
            hours,
            "rebalanced job"
        );
        loads[over] -= hours;
        loads[under] += hours;
        plan.moves.push(Reassignment {
            job_id,
            day,
            from_editor: editors[over].id.clone(),
            to_editor: editors[under].id.clone(),
            hours,
        });
    }
}
