use super::{parse_day, CohortStore};
use crate::{
    error::CohortResult,
    month::YearMonth,
    records::KycRecord,
};
use rusqlite::params;

impl CohortStore {
    // ── KYC ───────────────────────────────────────────────────────

    pub fn insert_kyc_event(
        &self,
        user_id: &str,
        event_type: &str,
        action_timestamp: &str,
    ) -> CohortResult<()> {
        self.conn.execute(
            "INSERT INTO kyc_log (user_id, type, action_timestamp) VALUES (?1, ?2, ?3)",
            params![user_id, event_type, action_timestamp],
        )?;
        Ok(())
    }

    /// First completion event of `event_type` per user, for users that
    /// have a profile. Later repeats of the same event are ignored.
    pub fn fetch_kyc(&self, event_type: &str) -> CohortResult<Vec<KycRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT kl.user_id, MIN(kl.action_timestamp)
             FROM kyc_log kl
             WHERE kl.type = ?1
               AND EXISTS (SELECT 1 FROM user_profile p WHERE p.user_id = kl.user_id)
             GROUP BY kl.user_id
             ORDER BY kl.user_id",
        )?;
        let rows = stmt
            .query_map(params![event_type], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(user_id, ts)| {
                let day = parse_day("kyc", &user_id, &ts)?;
                Ok(KycRecord::new(user_id, YearMonth::from_date(day)))
            })
            .collect()
    }
}
