//! SQLite source layer.
//!
//! RULE: Only store/ talks to the database.
//! The builder works on records; it never sees a connection or SQL.

use crate::{
    config::ReportConfig,
    error::{CohortError, CohortResult},
    records::CohortSources,
};
use chrono::NaiveDate;
use rusqlite::Connection;

mod investment;
mod kyc;
mod signup;

pub struct CohortStore {
    conn: Connection,
}

impl CohortStore {
    pub fn open(path: &str) -> CohortResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CohortResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn })
    }

    /// Create the source tables if they do not exist.
    pub fn migrate(&self) -> CohortResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_source.sql"))?;
        Ok(())
    }

    /// Fetch all three streams for one run.
    pub fn load_sources(&self, config: &ReportConfig) -> CohortResult<CohortSources> {
        log::info!("fetching signups with channel attribution");
        let signups = self.fetch_signups(&config.channel_rules)?;

        log::info!("fetching KYC completions ({})", config.kyc_event_type);
        let kyc = self.fetch_kyc(&config.kyc_event_type)?;

        log::info!("fetching investments");
        let investments = self.fetch_investments(config)?;

        log::info!(
            "-> {} signups, {} KYC records, {} investments",
            signups.len(),
            kyc.len(),
            investments.len()
        );
        Ok(CohortSources::new(signups, kyc, investments))
    }
}

/// Parse the calendar day out of an ISO-8601 date or datetime string.
pub(crate) fn parse_day(record: &'static str, user_id: &str, raw: &str) -> CohortResult<NaiveDate> {
    let day = raw.trim().get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| CohortError::InvalidRecord {
        record,
        user_id: user_id.to_string(),
        reason: format!("unparseable date '{raw}': {e}"),
    })
}
