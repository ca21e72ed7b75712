//! Acquisition channel attribution.
//!
//! Precedence, first match wins:
//!   1. Any UTM source, even an empty one                → Paid
//!   2. Affiliate code on the paid list                  → Paid
//!   3. Affiliate code on neither the paid nor organic list → Referred
//!   4. No affiliate code, or one on the organic list    → Organic
//!
//! Only a NULL UTM source is absent. Affiliate codes compare
//! case-insensitively, and a blank code counts as no code.

use crate::{config::ChannelRules, records::Channel};

pub fn classify(
    rules: &ChannelRules,
    utm_source: Option<&str>,
    affiliate_id: Option<&str>,
) -> Channel {
    if utm_source.is_some() {
        return Channel::Paid;
    }
    match present(affiliate_id) {
        None => Channel::Organic,
        Some(code) if listed(&rules.paid_affiliates, code) => Channel::Paid,
        Some(code) if listed(&rules.organic_affiliates, code) => Channel::Organic,
        Some(_) => Channel::Referred,
    }
}

fn listed(codes: &[String], code: &str) -> bool {
    codes.iter().any(|c| c.eq_ignore_ascii_case(code))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
