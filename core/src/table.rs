//! Cohort tables.
//!
//! Rows are built as sparse column → value maps because cohorts near the
//! present expose fewer relative-month columns than older ones. The column
//! order is fixed only when rows are assembled into a `CohortTable`; any
//! column a row lacks reads back as `CellValue::Missing`.

use crate::{metric::Metric, month::YearMonth};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Month,
    Signups,
    Kyc,
    KycPct,
    Investors,
    CurrentTai,
    ActivePct,
    /// Activity `n` whole calendar months after the cohort month.
    Relative(u32),
}

impl Column {
    pub fn name(&self) -> String {
        match self {
            Self::Month       => "Month".into(),
            Self::Signups     => "Signups".into(),
            Self::Kyc         => "KYC".into(),
            Self::KycPct      => "KYC%".into(),
            Self::Investors   => "Investors".into(),
            Self::CurrentTai  => "Current TAI".into(),
            Self::ActivePct   => "Active %".into(),
            Self::Relative(n) => format!("M{n}"),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// One cell. `Missing` means "undefined", which is not the same as zero.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Count(u64),
    Decimal(f64),
    Missing,
}

static MISSING: CellValue = CellValue::Missing;

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Count(n)   => Some(*n as f64),
            Self::Decimal(x) => Some(*x),
            _                => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _              => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s)    => f.write_str(s),
            Self::Count(n)   => write!(f, "{n}"),
            Self::Decimal(x) => write!(f, "{x}"),
            Self::Missing    => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortRow {
    pub month: YearMonth,
    pub cells: BTreeMap<Column, CellValue>,
}

impl CohortRow {
    pub fn new(month: YearMonth) -> Self {
        let mut cells = BTreeMap::new();
        cells.insert(Column::Month, CellValue::Text(month.to_string()));
        Self { month, cells }
    }

    pub fn get(&self, column: Column) -> &CellValue {
        self.cells.get(&column).unwrap_or(&MISSING)
    }

    /// Number of relative-month cells this row materialized.
    pub fn relative_len(&self) -> usize {
        self.cells
            .keys()
            .filter(|c| matches!(c, Column::Relative(_)))
            .count()
    }

    pub fn relative_values(&self) -> impl Iterator<Item = (u32, &CellValue)> {
        self.cells.iter().filter_map(|(c, v)| match c {
            Column::Relative(n) => Some((*n, v)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortTable {
    pub metric:  Metric,
    pub columns: Vec<Column>,
    pub rows:    Vec<CohortRow>,
}

impl CohortTable {
    /// A table with no cohorts. Valid output, not an error.
    pub fn empty(metric: Metric) -> Self {
        Self {
            metric,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Fix the column order: `Month`, the metric's header fields, then the
    /// union of every row's relative months in ascending order.
    pub fn assemble(metric: Metric, mut rows: Vec<CohortRow>) -> Self {
        if rows.is_empty() {
            return Self::empty(metric);
        }
        rows.sort_by_key(|r| r.month);

        let relative: BTreeSet<u32> = rows
            .iter()
            .flat_map(|r| r.relative_values().map(|(n, _)| n))
            .collect();

        let mut columns = vec![Column::Month];
        columns.extend_from_slice(metric.header_columns());
        columns.extend(relative.into_iter().map(Column::Relative));

        Self {
            metric,
            columns,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, month: YearMonth) -> Option<&CohortRow> {
        self.rows.iter().find(|r| r.month == month)
    }

    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Rows rendered in column order. Missing cells render as "".
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|row| {
            self.columns
                .iter()
                .map(|c| row.get(*c).to_string())
                .collect()
        })
    }
}
