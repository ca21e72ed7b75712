//! Metric modes and their aggregation strategies.
//!
//! Both modes share one control flow in builder.rs. They differ only in
//! which header fields a row carries and how a relative-month cell is
//! aggregated, so each mode resolves once per build to an `Aggregation`
//! holding those two functions.

use crate::{
    clock::RunClock,
    error::CohortError,
    month::YearMonth,
    records::InvestmentRecord,
    table::{CellValue, Column},
    types::{round2, CRORE},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Distinct investing users per relative month.
    Investors,
    /// Deployed capital per relative month, in crores.
    Aum,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Investors, Metric::Aum];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Investors => "investors",
            Self::Aum       => "aum",
        }
    }

    /// Name used in sheet titles.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Investors => "Investors",
            Self::Aum       => "AUM",
        }
    }

    /// Header fields between `Month` and `M0`, in output order.
    pub fn header_columns(&self) -> &'static [Column] {
        match self {
            Self::Investors => &[Column::Signups, Column::Kyc, Column::KycPct],
            Self::Aum       => &[Column::Investors, Column::CurrentTai, Column::ActivePct],
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        match self {
            Self::Investors => Aggregation {
                header: investors_header,
                cell:   distinct_investors,
            },
            Self::Aum => Aggregation {
                header: aum_header,
                cell:   crore_sum,
            },
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CohortError::UnknownMetric {
                value: s.to_string(),
            })
    }
}

// ── Aggregation strategy ─────────────────────────────────────────────────────

/// An investment joined to its cohort, with its offset from the cohort month.
#[derive(Debug, Clone, Copy)]
pub struct PlacedInvestment<'a> {
    pub months_since: i64,
    pub investment:   &'a InvestmentRecord,
}

/// Everything a header builder may look at for one cohort.
pub struct CohortSlice<'a> {
    pub month:       YearMonth,
    /// Distinct user ids in the cohort (after any channel filter).
    pub users:       &'a BTreeSet<&'a str>,
    /// Distinct users whose KYC month equals this cohort month.
    pub kyc_users:   Option<&'a BTreeSet<&'a str>>,
    pub investments: &'a [PlacedInvestment<'a>],
    pub clock:       &'a RunClock,
}

impl<'a> CohortSlice<'a> {
    /// Investments landing exactly `m` months after the cohort month.
    pub fn in_month(&self, m: i64) -> Vec<&'a InvestmentRecord> {
        self.investments
            .iter()
            .filter(|p| p.months_since == m)
            .map(|p| p.investment)
            .collect()
    }
}

pub type HeaderFn = fn(&CohortSlice<'_>) -> Vec<(Column, CellValue)>;
pub type CellFn = fn(&[&InvestmentRecord]) -> CellValue;

#[derive(Clone, Copy)]
pub struct Aggregation {
    pub header: HeaderFn,
    pub cell:   CellFn,
}

fn distinct_users<'a>(investments: impl IntoIterator<Item = &'a InvestmentRecord>) -> u64 {
    investments
        .into_iter()
        .map(|i| i.user_id.as_str())
        .collect::<BTreeSet<_>>()
        .len() as u64
}

fn distinct_investors(investments: &[&InvestmentRecord]) -> CellValue {
    CellValue::Count(distinct_users(investments.iter().copied()))
}

fn crore_sum(investments: &[&InvestmentRecord]) -> CellValue {
    let total: f64 = investments.iter().map(|i| i.amount).sum();
    CellValue::Decimal(round2(total / CRORE))
}

/// `Signups`, `KYC` (same-month conversions only) and `KYC%`.
/// `KYC%` is 0.0 on an empty cohort.
fn investors_header(cohort: &CohortSlice<'_>) -> Vec<(Column, CellValue)> {
    let signups = cohort.users.len() as u64;
    let kyc = cohort
        .kyc_users
        .map(|k| k.intersection(cohort.users).count() as u64)
        .unwrap_or(0);
    let kyc_pct = if signups > 0 {
        round2(kyc as f64 / signups as f64 * 100.0)
    } else {
        0.0
    };

    vec![
        (Column::Signups, CellValue::Count(signups)),
        (Column::Kyc,     CellValue::Count(kyc)),
        (Column::KycPct,  CellValue::Decimal(kyc_pct)),
    ]
}

/// `Investors` (distinct M0 investors), `Current TAI` (distinct cohort
/// investors active in the trailing window, any relative month) and
/// `Active %`, which is Missing rather than zero when nobody invested in M0.
fn aum_header(cohort: &CohortSlice<'_>) -> Vec<(Column, CellValue)> {
    let investors = distinct_users(cohort.in_month(0));
    let current_tai = distinct_users(
        cohort
            .investments
            .iter()
            .map(|p| p.investment)
            .filter(|i| cohort.clock.is_recent(i.invest_date)),
    );
    let active_pct = if investors > 0 {
        CellValue::Decimal(round2(current_tai as f64 / investors as f64 * 100.0))
    } else {
        CellValue::Missing
    };

    vec![
        (Column::Investors,  CellValue::Count(investors)),
        (Column::CurrentTai, CellValue::Count(current_tai)),
        (Column::ActivePct,  active_pct),
    ]
}
