//! Report runner. Plans and builds the sheet matrix for one run.
//!
//! SHEET ORDER (fixed):
//!   1. Overall, one sheet per metric
//!   2. Each product split, in label order, one sheet per metric
//!   3. Each channel present in the signups, in label order, one per metric
//!
//! Sheets whose table comes back empty are skipped, not written blank.

use crate::{
    builder::CohortQuery,
    clock::RunClock,
    config::ReportConfig,
    error::CohortResult,
    metric::Metric,
    month::YearMonth,
    records::{Channel, CohortSources, ProductCategory},
    table::CohortTable,
};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetScope {
    Overall,
    Product(ProductCategory),
    Channel(Channel),
}

impl SheetScope {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Overall     => "Absolute",
            Self::Product(p)  => p.abbreviation(),
            Self::Channel(c)  => c.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSpec {
    pub name:   String,
    pub metric: Metric,
    pub scope:  SheetScope,
}

impl SheetSpec {
    pub fn new(metric: Metric, scope: SheetScope) -> Self {
        Self {
            name: format!("All Users - {} - {}", metric.display_name(), scope.suffix()),
            metric,
            scope,
        }
    }

    pub fn query(&self, start: YearMonth, end: YearMonth) -> CohortQuery {
        let query = CohortQuery::new(start, end, self.metric);
        match self.scope {
            SheetScope::Overall    => query,
            SheetScope::Product(p) => query.with_product(p),
            SheetScope::Channel(c) => query.with_channel(c),
        }
    }
}

/// Every sheet a run produces, in output order.
pub fn plan_sheets(channels: &[Channel]) -> Vec<SheetSpec> {
    let scopes = std::iter::once(SheetScope::Overall)
        .chain(ProductCategory::SPLITS.into_iter().map(SheetScope::Product))
        .chain(channels.iter().copied().map(SheetScope::Channel));

    scopes
        .flat_map(|scope| Metric::ALL.into_iter().map(move |m| SheetSpec::new(m, scope)))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name:  String,
    pub table: CohortTable,
}

#[derive(Debug, Clone)]
pub struct Workbook {
    pub start_month:  YearMonth,
    pub end_month:    YearMonth,
    pub generated_at: NaiveDateTime,
    /// Sheets planned, including the empty ones that were skipped.
    pub planned:      usize,
    pub sheets:       Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// Build every planned sheet against one set of sources and one clock.
pub fn run_report(
    sources: &CohortSources,
    config: &ReportConfig,
    clock: &RunClock,
) -> CohortResult<Workbook> {
    let start = config.start_month;
    let end = config.resolve_end_month(clock);
    let plan = plan_sheets(&sources.channels());
    let total = plan.len();

    log::info!("generating {total} sheets for {start} to {end}");

    let mut sheets = Vec::new();
    for (i, spec) in plan.iter().enumerate() {
        log::info!("[{}/{}] {}", i + 1, total, spec.name);

        let query = spec
            .query(start, end)
            .excluding_pre_signup(config.exclude_pre_signup_investments);
        let table = sources.build_table(&query, clock)?;

        if table.is_empty() {
            log::info!("  skipped {}: no cohorts", spec.name);
            continue;
        }
        sheets.push(Sheet {
            name: spec.name.clone(),
            table,
        });
    }

    Ok(Workbook {
        start_month: start,
        end_month: end,
        generated_at: clock.now,
        planned: total,
        sheets,
    })
}
