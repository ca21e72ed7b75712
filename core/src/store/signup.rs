use super::{parse_day, CohortStore};
use crate::{
    attribution,
    config::ChannelRules,
    error::CohortResult,
    records::SignupRecord,
};
use rusqlite::params;

impl CohortStore {
    // ── Signups ───────────────────────────────────────────────────

    pub fn insert_profile(&self, user_id: &str, created_at: &str) -> CohortResult<()> {
        self.conn.execute(
            "INSERT INTO user_profile (user_id, created_at) VALUES (?1, ?2)",
            params![user_id, created_at],
        )?;
        Ok(())
    }

    pub fn insert_identity(
        &self,
        user_id: &str,
        utm_source: Option<&str>,
        affiliate_id: Option<&str>,
    ) -> CohortResult<()> {
        self.conn.execute(
            "INSERT INTO identity_user (id, utm_source, affiliate_id) VALUES (?1, ?2, ?3)",
            params![user_id, utm_source, affiliate_id],
        )?;
        Ok(())
    }

    /// One signup per profile, oldest first, with its attributed channel.
    /// Profiles without an identity row attribute as Organic.
    pub fn fetch_signups(&self, rules: &ChannelRules) -> CohortResult<Vec<SignupRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.user_id, p.created_at, iu.utm_source, iu.affiliate_id
             FROM user_profile p
             LEFT JOIN identity_user iu ON p.user_id = iu.id
             ORDER BY p.created_at, p.user_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(user_id, created_at, utm_source, affiliate_id)| {
                let signup_date = parse_day("signup", &user_id, &created_at)?;
                let channel = attribution::classify(
                    rules,
                    utm_source.as_deref(),
                    affiliate_id.as_deref(),
                );
                Ok(SignupRecord::new(user_id, signup_date, channel))
            })
            .collect()
    }
}
