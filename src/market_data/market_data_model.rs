use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Real-time indicative quote for an instrument, as returned by a quote
/// adapter. Not authoritative: `price` is the provider's live estimate and
/// `last_official_price` is the most recent published close it knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicativeQuote {
    pub code: String,
    pub display_name: String,
    pub price: Decimal,
    pub change_pct: Decimal,
    pub as_of_time: DateTime<Utc>,
    pub last_official_price: Option<Decimal>,
}

impl IndicativeQuote {
    /// A quote is usable as a live price when it carries a positive value.
    /// Staleness relative to market hours is the router's concern, not the
    /// quote's.
    pub fn has_live_price(&self) -> bool {
        self.price > Decimal::ZERO
    }
}

/// Live quote for one constituent of an instrument's disclosed holdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstituentQuote {
    pub code: String,
    pub price: Decimal,
    pub change_pct: Decimal,
}

/// One line of a holdings disclosure: constituent code plus its weight in
/// percent of the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingWeight {
    pub constituent_code: String,
    pub weight_pct: Decimal,
}

/// Disclosed holdings composition for an instrument, dated by the
/// disclosure's as-of date when the provider knows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsDisclosure {
    pub code: String,
    pub as_of: Option<NaiveDate>,
    pub holdings: Vec<HoldingWeight>,
}

/// Authoritative end-of-day price for one (instrument, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialPrice {
    pub code: String,
    pub price_date: NaiveDate,
    pub price: Decimal,
}

/// Static instrument metadata as a profile adapter reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub display_name: String,
    pub category: Option<String>,
    pub is_passively_tracked: bool,
    pub is_cross_border: bool,
    pub tracked_index: Option<String>,
}

/// Strips exchange prefixes ("sh600000" -> "600000") so constituent codes
/// from holdings disclosures and quote feeds key the same map.
pub fn normalize_constituent_code(code: &str) -> String {
    let s = code.trim().to_lowercase();
    for prefix in ["sh", "sz", "bj"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    s
}
