use crate::{
    clock::RunClock,
    month::YearMonth,
    records::ProductCategory,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Affiliate codes that drive channel attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRules {
    /// Affiliate codes that are paid partnerships even without a UTM source.
    pub paid_affiliates: Vec<String>,
    /// Affiliate codes that count as organic (promo codes, not partners).
    pub organic_affiliates: Vec<String>,
}

impl Default for ChannelRules {
    fn default() -> Self {
        let paid = [
            "JRLADDHA", "Refer_NC_22", "THEFINTALES", "RANDOMDIMES", "ANKIT91", "S9FINTECH",
            "PROSPRR", "MONEYMANTRA", "KALPESHPATEL", "MUSKAN5000", "RAM5000", "TRYLEAF",
            "INVEST100", "CKLEAF", "EKLEAF",
        ];
        Self {
            paid_affiliates: paid.iter().map(|s| s.to_string()).collect(),
            organic_affiliates: vec!["JUNE500".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub start_month: YearMonth,
    /// `None` means the last fully completed month at run time.
    pub end_month: Option<YearMonth>,
    pub output_dir: PathBuf,
    /// Raw deal type → product category. Unlisted deal types map to Other.
    pub deal_type_products: BTreeMap<String, ProductCategory>,
    pub channel_rules: ChannelRules,
    /// Investment statuses that represent deployed capital.
    pub investment_statuses: Vec<i64>,
    pub excluded_deal_types: Vec<String>,
    /// The KYC log event that marks completion.
    pub kyc_event_type: String,
    pub exclude_pre_signup_investments: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let deal_type_products = [
            ("ASSET_LEASING", ProductCategory::AssetLeasing),
            ("NON_CONVERTIBLE_DEBENTURES", ProductCategory::Bonds),
            ("INVOICE_DISCOUNTING", ProductCategory::InvoiceDiscounting),
            ("SECONDARY_NON_CONVERTIBLE_DEBENTURES", ProductCategory::Bonds),
            ("TAP_3M_FIXED", ProductCategory::P2p),
            ("TAP_6M_FIXED", ProductCategory::P2p),
            ("GOLD", ProductCategory::Gold),
            ("FIXED_DEPOSIT", ProductCategory::FixedDeposit),
            ("PRE_IPO", ProductCategory::PreIpo),
            ("SILVER", ProductCategory::Silver),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            start_month: YearMonth { year: 2022, month: 1 },
            end_month: None,
            output_dir: default_output_dir(),
            deal_type_products,
            channel_rules: ChannelRules::default(),
            investment_statuses: vec![11, 5],
            excluded_deal_types: vec!["POOLING".into(), "CROSS_SALE".into()],
            kyc_event_type: "BANK_ACCOUNT_CREATE".into(),
            exclude_pre_signup_investments: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join("Downloads"))
        .unwrap_or_else(|_| PathBuf::from("."))
}

impl ReportConfig {
    /// Load from a JSON file. Missing keys fall back to the defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ReportConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    pub fn resolve_end_month(&self, clock: &RunClock) -> YearMonth {
        self.end_month.unwrap_or_else(|| clock.last_complete_month())
    }

    pub fn product_for(&self, deal_type: &str) -> ProductCategory {
        self.deal_type_products
            .get(deal_type)
            .copied()
            .unwrap_or(ProductCategory::Other)
    }
}
