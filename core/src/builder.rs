//! Cohort table builder.
//!
//! STEPS (fixed order):
//!   1. Validate the query range and every investment amount.
//!   2. Channel filter narrows signups. Empty → empty table.
//!   3. Product filter narrows investments. Empty → empty table.
//!   4. Join investments to their investor's signup; orphans drop out.
//!   5. Walk cohort months start..=end, emitting one row per non-empty cohort.
//!
//! RULES:
//!   - Pure: reads only its inputs and the injected `RunClock`.
//!   - Relative months are counted from the cohort month, not the signup day.
//!   - The in-progress month is never materialized as a column.

use crate::{
    clock::RunClock,
    error::{CohortError, CohortResult},
    metric::{CohortSlice, Metric, PlacedInvestment},
    month::YearMonth,
    records::{
        Channel, CohortSources, InvestmentRecord, KycRecord, ProductCategory, SignupRecord,
    },
    table::{CohortRow, CohortTable, Column},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// What to build: range, metric and optional filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortQuery {
    pub start_month:    YearMonth,
    pub end_month:      YearMonth,
    pub metric:         Metric,
    pub product_filter: Option<ProductCategory>,
    pub channel_filter: Option<Channel>,
    /// Drop investments dated before the investor's own signup date.
    #[serde(default)]
    pub exclude_pre_signup: bool,
}

impl CohortQuery {
    pub fn new(start_month: YearMonth, end_month: YearMonth, metric: Metric) -> Self {
        Self {
            start_month,
            end_month,
            metric,
            product_filter: None,
            channel_filter: None,
            exclude_pre_signup: false,
        }
    }

    pub fn with_product(mut self, product: ProductCategory) -> Self {
        self.product_filter = Some(product);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel_filter = Some(channel);
        self
    }

    pub fn excluding_pre_signup(mut self, exclude: bool) -> Self {
        self.exclude_pre_signup = exclude;
        self
    }

    pub fn validate(&self) -> CohortResult<()> {
        if self.end_month < self.start_month {
            return Err(CohortError::InvalidRange {
                start: self.start_month.to_string(),
                end: self.end_month.to_string(),
            });
        }
        Ok(())
    }
}

impl CohortSources {
    pub fn build_table(&self, query: &CohortQuery, clock: &RunClock) -> CohortResult<CohortTable> {
        build(&self.signups, &self.kyc, &self.investments, query, clock)
    }
}

/// Build one cohort table.
///
/// An empty table is a normal outcome: the channel filter left no signups,
/// the product filter left no investments, or no month in range had a
/// signup. Errors are reserved for caller contract violations (reversed
/// range) and bad records (negative or non-finite amounts).
pub fn build(
    signups: &[SignupRecord],
    kyc: &[KycRecord],
    investments: &[InvestmentRecord],
    query: &CohortQuery,
    clock: &RunClock,
) -> CohortResult<CohortTable> {
    query.validate()?;
    for investment in investments {
        investment.validate()?;
    }

    let signups: Vec<&SignupRecord> = signups
        .iter()
        .filter(|s| query.channel_filter.map_or(true, |c| s.channel == c))
        .collect();
    if signups.is_empty() {
        log::debug!("no signups left after channel filter {:?}", query.channel_filter);
        return Ok(CohortTable::empty(query.metric));
    }

    let investments: Vec<&InvestmentRecord> = investments
        .iter()
        .filter(|i| query.product_filter.map_or(true, |p| i.product == p))
        .collect();
    if investments.is_empty() {
        log::debug!("no investments left after product filter {:?}", query.product_filter);
        return Ok(CohortTable::empty(query.metric));
    }

    // First signup wins if a user id repeats.
    let mut signup_by_user: HashMap<&str, &SignupRecord> = HashMap::new();
    for s in &signups {
        signup_by_user.entry(s.user_id.as_str()).or_insert(*s);
    }

    let mut users_by_month: BTreeMap<YearMonth, BTreeSet<&str>> = BTreeMap::new();
    for s in signup_by_user.values() {
        users_by_month
            .entry(s.signup_month)
            .or_default()
            .insert(s.user_id.as_str());
    }

    let mut investments_by_month: BTreeMap<YearMonth, Vec<&InvestmentRecord>> = BTreeMap::new();
    let mut pre_signup = 0usize;
    for investment in &investments {
        let Some(signup) = signup_by_user.get(investment.user_id.as_str()) else {
            continue;
        };
        if investment.invest_date < signup.signup_date {
            pre_signup += 1;
            if query.exclude_pre_signup {
                continue;
            }
        }
        investments_by_month
            .entry(signup.signup_month)
            .or_default()
            .push(investment);
    }
    if pre_signup > 0 {
        log::warn!(
            "{pre_signup} investment(s) dated before the investor's signup date ({})",
            if query.exclude_pre_signup { "excluded" } else { "kept" }
        );
    }

    let mut kyc_by_month: BTreeMap<YearMonth, BTreeSet<&str>> = BTreeMap::new();
    for k in kyc {
        kyc_by_month
            .entry(k.kyc_month)
            .or_default()
            .insert(k.user_id.as_str());
    }

    let aggregation = query.metric.aggregation();
    let current_month = clock.current_month();
    let mut rows = Vec::new();

    for month in YearMonth::range_inclusive(query.start_month, query.end_month) {
        let Some(users) = users_by_month.get(&month) else {
            continue;
        };

        let placed: Vec<PlacedInvestment<'_>> = investments_by_month
            .get(&month)
            .map(|batch| {
                batch
                    .iter()
                    .map(|i| PlacedInvestment {
                        months_since: month.months_until(YearMonth::from_date(i.invest_date)),
                        investment: *i,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let cohort = CohortSlice {
            month,
            users,
            kyc_users: kyc_by_month.get(&month),
            investments: &placed,
            clock,
        };

        let mut row = CohortRow::new(month);
        row.cells.extend((aggregation.header)(&cohort));

        // -1 for a cohort signed up this month: header only, no M columns.
        let max_months = month.months_until(current_month) - 1;
        for m in 0..=max_months {
            let batch = cohort.in_month(m);
            row.cells.insert(Column::Relative(m as u32), (aggregation.cell)(&batch));
        }

        log::debug!(
            "cohort {month}: {} users, {} investments, {} relative months",
            users.len(),
            placed.len(),
            row.relative_len()
        );
        rows.push(row);
    }

    Ok(CohortTable::assemble(query.metric, rows))
}
