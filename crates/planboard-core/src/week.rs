//! Seven-day planning windows.

use std::fmt;

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::{DAYS_PER_WEEK, monday_of};

/// A Monday-to-Sunday window keyed by its Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekWindow {
    start: NaiveDate,
}

impl WeekWindow {
    /// The week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            start: monday_of(date),
        }
    }

    /// The week containing today, in local time.
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// Monday of the week.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Sunday of the week.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(i64::from(DAYS_PER_WEEK) - 1)
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::days(7),
        }
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::days(7),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }

    /// Calendar date of day index `day`, if in range.
    pub fn date(&self, day: u8) -> Option<NaiveDate> {
        (day < DAYS_PER_WEEK).then(|| self.start + Duration::days(i64::from(day)))
    }

    /// All seven dates, Monday first.
    pub fn dates(&self) -> [NaiveDate; DAYS_PER_WEEK as usize] {
        std::array::from_fn(|i| self.start + Duration::days(i as i64))
    }

    /// Day index of `date` within its own week.
    pub fn day_index(date: NaiveDate) -> u8 {
        date.weekday().num_days_from_monday() as u8
    }

    /// Human-readable label, e.g. `Week of Jan 6–12, 2025`.
    ///
    /// A week spanning two months names both: `Week of Jan 27 – Feb 2, 2025`.
    /// The year is always the Monday's.
    pub fn label(&self) -> String {
        let end = self.end();
        let start_month = self.start.format("%b");
        let year = self.start.year();
        if self.start.month() == end.month() {
            format!(
                "Week of {start_month} {}–{}, {year}",
                self.start.day(),
                end.day()
            )
        } else {
            format!(
                "Week of {start_month} {} – {} {}, {year}",
                self.start.day(),
                end.format("%b"),
                end.day()
            )
        }
    }
}

impl fmt::Display for WeekWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format("%Y-%m-%d"))
    }
}
