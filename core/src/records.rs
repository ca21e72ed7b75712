//! Input records: signups, KYC completions and investments.
//!
//! These are read-only snapshots. The builder reshapes and aggregates
//! references to them; nothing here is mutated after loading.

use crate::{
    error::{CohortError, CohortResult},
    month::YearMonth,
    types::UserId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ── Channel ──────────────────────────────────────────────────────────────────

/// Acquisition channel a signup is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    Paid,
    Referred,
    Organic,
    Unknown,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Paid,
        Channel::Referred,
        Channel::Organic,
        Channel::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Paid     => "Paid",
            Self::Referred => "Referred",
            Self::Organic  => "Organic",
            Self::Unknown  => "Unknown",
        }
    }

    /// Parse a stored channel label. Anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label.trim()))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Product category ─────────────────────────────────────────────────────────

/// Product category an investment is mapped to from its raw deal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    #[serde(rename = "Asset Leasing")]
    AssetLeasing,
    #[serde(rename = "Bonds")]
    Bonds,
    #[serde(rename = "Fixed Deposit")]
    FixedDeposit,
    #[serde(rename = "Gold")]
    Gold,
    #[serde(rename = "Invoice Discounting")]
    InvoiceDiscounting,
    #[serde(rename = "P2P")]
    P2p,
    #[serde(rename = "Pre-IPO")]
    PreIpo,
    #[serde(rename = "Silver")]
    Silver,
    #[serde(rename = "Other")]
    Other,
}

impl ProductCategory {
    /// Categories that get their own product-split sheets, in label order.
    /// `Other` only collects unmapped deal types and is never split out.
    pub const SPLITS: [ProductCategory; 8] = [
        ProductCategory::AssetLeasing,
        ProductCategory::Bonds,
        ProductCategory::FixedDeposit,
        ProductCategory::Gold,
        ProductCategory::InvoiceDiscounting,
        ProductCategory::P2p,
        ProductCategory::PreIpo,
        ProductCategory::Silver,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::AssetLeasing       => "Asset Leasing",
            Self::Bonds              => "Bonds",
            Self::FixedDeposit       => "Fixed Deposit",
            Self::Gold               => "Gold",
            Self::InvoiceDiscounting => "Invoice Discounting",
            Self::P2p                => "P2P",
            Self::PreIpo             => "Pre-IPO",
            Self::Silver             => "Silver",
            Self::Other              => "Other",
        }
    }

    /// Short form used in sheet names.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::AssetLeasing       => "AL",
            Self::FixedDeposit       => "FD",
            Self::InvoiceDiscounting => "ID",
            other                    => other.label(),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::SPLITS
            .into_iter()
            .chain([Self::Other])
            .find(|p| p.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupRecord {
    pub user_id:      UserId,
    pub signup_month: YearMonth,
    pub signup_date:  NaiveDate,
    pub channel:      Channel,
}

impl SignupRecord {
    pub fn new(user_id: impl Into<UserId>, signup_date: NaiveDate, channel: Channel) -> Self {
        Self {
            user_id: user_id.into(),
            signup_month: YearMonth::from_date(signup_date),
            signup_date,
            channel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRecord {
    pub user_id:   UserId,
    pub kyc_month: YearMonth,
}

impl KycRecord {
    pub fn new(user_id: impl Into<UserId>, kyc_month: YearMonth) -> Self {
        Self {
            user_id: user_id.into(),
            kyc_month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRecord {
    pub user_id:      UserId,
    pub invest_month: YearMonth,
    pub invest_date:  NaiveDate,
    /// Raw currency units. Never negative.
    pub amount:       f64,
    pub product:      ProductCategory,
}

impl InvestmentRecord {
    pub fn new(
        user_id: impl Into<UserId>,
        invest_date: NaiveDate,
        amount: f64,
        product: ProductCategory,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            invest_month: YearMonth::from_date(invest_date),
            invest_date,
            amount,
            product,
        }
    }

    /// Reject amounts that would silently corrupt AUM sums.
    pub fn validate(&self) -> CohortResult<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(CohortError::InvalidRecord {
                record: "investment",
                user_id: self.user_id.clone(),
                reason: format!("amount must be a non-negative number, got {}", self.amount),
            });
        }
        Ok(())
    }
}

// ── Sources ──────────────────────────────────────────────────────────────────

/// The three streams for one run, loaded once and shared by every sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortSources {
    pub signups:     Vec<SignupRecord>,
    pub kyc:         Vec<KycRecord>,
    pub investments: Vec<InvestmentRecord>,
}

impl CohortSources {
    pub fn new(
        signups: Vec<SignupRecord>,
        kyc: Vec<KycRecord>,
        investments: Vec<InvestmentRecord>,
    ) -> Self {
        Self {
            signups,
            kyc,
            investments,
        }
    }

    /// Channels actually present among signups, sorted by label.
    pub fn channels(&self) -> Vec<Channel> {
        let present: BTreeSet<&'static str> =
            self.signups.iter().map(|s| s.channel.label()).collect();
        present.into_iter().map(Channel::from_label).collect()
    }
}
