//! Per-editor weekly utilization.

use chrono::NaiveDate;

use crate::types::{Editor, Job};

/// Hours assigned to `editor_id` in the week starting `week_start`.
pub fn assigned_hours(jobs: &[Job], editor_id: &str, week_start: NaiveDate) -> f64 {
    jobs.iter()
        .filter(|job| job.editor_id == editor_id && job.week_start == week_start)
        .map(|job| job.estimated_hours)
        .sum()
}

/// `hours` as a percentage of `weekly_capacity`, rounded and capped at 100.
///
/// The caller guarantees a positive capacity; anything else reads as full.
pub fn utilization_percent(hours: f64, weekly_capacity: f64) -> u8 {
    if !(weekly_capacity.is_finite() && weekly_capacity > 0.0) {
        return 100;
    }
    let percent = (100.0 * hours / weekly_capacity).clamp(0.0, 100.0);
    percent.round() as u8
}

/// Utilization of one editor for a week, in `0..=100`.
///
/// Unknown editors, or editors whose capacity is not positive, are measured
/// against `default_capacity`.
pub fn capacity(
    jobs: &[Job],
    editors: &[Editor],
    editor_id: &str,
    week_start: NaiveDate,
    default_capacity: f64,
) -> u8 {
    let weekly_capacity = editors
        .iter()
        .find(|editor| editor.id == editor_id)
        .map(|editor| editor.weekly_capacity)
        .filter(|capacity| capacity.is_finite() && *capacity > 0.0)
        .unwrap_or(default_capacity);
    utilization_percent(assigned_hours(jobs, editor_id, week_start), weekly_capacity)
}
