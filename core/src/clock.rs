//! Run clock: the single "now" a report run is evaluated against.
//!
//! RULE: Nothing under builder.rs reads the wall clock.
//! The driver snapshots the time once and passes the clock down, so every
//! table in a run agrees on the current month and the activity window.

use crate::{
    month::YearMonth,
    types::ACTIVE_WINDOW_DAYS,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunClock {
    pub now: NaiveDateTime,
}

impl RunClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// Snapshot local wall-clock time. Only the driver calls this.
    pub fn from_system() -> Self {
        Self::new(chrono::Local::now().naive_local())
    }

    /// The in-progress month. Never materialized as a cohort column.
    pub fn current_month(&self) -> YearMonth {
        YearMonth::from_date(self.now.date())
    }

    pub fn last_complete_month(&self) -> YearMonth {
        YearMonth::last_complete(self.now)
    }

    /// Start of the trailing activity window (now minus 30 days).
    pub fn active_window_start(&self) -> NaiveDateTime {
        self.now - Duration::days(ACTIVE_WINDOW_DAYS)
    }

    /// True when an investment dated `date` (taken at midnight) falls inside
    /// the trailing activity window.
    pub fn is_recent(&self, date: NaiveDate) -> bool {
        date.and_hms_opt(0, 0, 0)
            .is_some_and(|midnight| midnight >= self.active_window_start())
    }

    /// Timestamp used in output artifact names.
    pub fn run_stamp(&self) -> String {
        self.now.format("%Y%m%d_%H%M%S").to_string()
    }
}
