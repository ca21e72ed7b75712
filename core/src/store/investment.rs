use super::{parse_day, CohortStore};
use crate::{
    config::ReportConfig,
    error::{CohortError, CohortResult},
    records::{InvestmentRecord, ProductCategory},
};
use rusqlite::{params, params_from_iter, types::Value};

impl CohortStore {
    // ── Investments ───────────────────────────────────────────────

    pub fn insert_investment(
        &self,
        user_id: &str,
        date: Option<&str>,
        amount: Option<f64>,
        deal_type: &str,
        status: i64,
    ) -> CohortResult<()> {
        self.conn.execute(
            "INSERT INTO investment (user_id, date, amount, deal_type, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, date, amount, deal_type, status],
        )?;
        Ok(())
    }

    /// Counted investments of profiled users, mapped to product categories.
    ///
    /// A NULL date or amount fails the fetch with `MissingField`; it is
    /// never coerced to zero.
    pub fn fetch_investments(&self, config: &ReportConfig) -> CohortResult<Vec<InvestmentRecord>> {
        let mut bind: Vec<Value> = Vec::new();
        let statuses = placeholders(
            &mut bind,
            config.investment_statuses.iter().map(|s| Value::Integer(*s)),
        );
        let excluded = placeholders(
            &mut bind,
            config.excluded_deal_types.iter().map(|d| Value::Text(d.clone())),
        );

        let sql = format!(
            "SELECT i.user_id, i.date, i.amount, i.deal_type
             FROM investment i
             WHERE EXISTS (SELECT 1 FROM user_profile p WHERE p.user_id = i.user_id)
               AND i.status IN ({statuses})
               AND i.deal_type NOT IN ({excluded})
             ORDER BY i.date, i.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut unmapped = 0usize;
        let investments = rows
            .into_iter()
            .map(|(user_id, date, amount, deal_type)| {
                let date = date.ok_or_else(|| missing(&user_id, "date"))?;
                let amount = amount.ok_or_else(|| missing(&user_id, "amount"))?;
                let invest_date = parse_day("investment", &user_id, &date)?;
                let product = config.product_for(&deal_type);
                if product == ProductCategory::Other {
                    unmapped += 1;
                }
                let record = InvestmentRecord::new(user_id, invest_date, amount, product);
                record.validate()?;
                Ok(record)
            })
            .collect::<CohortResult<Vec<_>>>()?;

        if unmapped > 0 {
            log::warn!("{unmapped} investment(s) with unmapped deal types counted as Other");
        }
        Ok(investments)
    }
}

/// Push `values` onto `bind` and return their `?N` placeholder list.
/// An empty list binds a sentinel no row carries, so `IN` matches nothing
/// and `NOT IN` matches everything.
fn placeholders(bind: &mut Vec<Value>, values: impl Iterator<Item = Value>) -> String {
    let start = bind.len();
    bind.extend(values);
    if bind.len() == start {
        bind.push(Value::Text("\u{0}".into()));
    }
    (start + 1..=bind.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn missing(user_id: &str, field: &'static str) -> CohortError {
    CohortError::MissingField {
        record: "investment",
        user_id: user_id.to_string(),
        field,
    }
}
