//! Calendar-month arithmetic.
//!
//! Cohorts, KYC completions and investments are all bucketed by calendar
//! month. `YearMonth` is the single month type the pipeline uses; it
//! serializes as the `YYYY-MM` string the source data carries.

use crate::error::{CohortError, CohortResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub(crate) year:  i32,
    pub(crate) month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> CohortResult<Self> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(CohortError::InvalidMonth {
                value: format!("{year}-{month}"),
            });
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months elapsed since year 0, January.
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// Whole calendar months from `self` to `later`. Negative when `later`
    /// precedes `self`.
    pub fn months_until(&self, later: YearMonth) -> i64 {
        later.ordinal() - self.ordinal()
    }

    pub fn succ(&self) -> Self {
        Self::from_ordinal(self.ordinal() + 1)
    }

    pub fn pred(&self) -> Self {
        Self::from_ordinal(self.ordinal() - 1)
    }

    /// Every month from `start` to `end`, both inclusive. Empty when
    /// `end < start`.
    pub fn range_inclusive(start: YearMonth, end: YearMonth) -> impl Iterator<Item = YearMonth> {
        std::iter::successors(Some(start), |m| Some(m.succ())).take_while(move |m| *m <= end)
    }

    /// The most recent fully completed month as of `now`.
    pub fn last_complete(now: NaiveDateTime) -> Self {
        Self::from_date(now.date()).pred()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CohortError;

    fn from_str(s: &str) -> CohortResult<Self> {
        let invalid = || CohortError::InvalidMonth {
            value: s.to_string(),
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = CohortError;

    fn try_from(value: String) -> CohortResult<Self> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}
