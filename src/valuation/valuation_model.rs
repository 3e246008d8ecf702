use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::instruments::InstrumentProfile;
use crate::market_data::{ConstituentQuote, HoldingsDisclosure, IndicativeQuote, OfficialPrice};

/// One priced answer from the valuation router. Transient: folded into
/// ledger and intraday records, never stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    pub instrument_code: String,
    pub display_name: String,
    pub estimated_price: Decimal,
    pub estimated_change_pct: Decimal,
    pub method: String,
    pub confidence: f64,
    pub as_of_time: DateTime<Utc>,
    pub warning: Option<String>,
    pub suggested_poll_secs: u64,
    pub coverage_pct: Option<Decimal>,
}

impl EstimateResult {
    pub fn has_price(&self) -> bool {
        self.estimated_price > Decimal::ZERO
    }
}

/// Everything the strategy chain needs, fetched once per batch. Strategies
/// are pure lookups over this context; all external calls happen before the
/// chain runs.
pub struct EstimationContext {
    pub now: DateTime<Utc>,
    pub in_market_hours: bool,
    pub quotes: HashMap<String, IndicativeQuote>,
    pub profiles: HashMap<String, InstrumentProfile>,
    pub holdings: HashMap<String, HoldingsDisclosure>,
    pub constituent_quotes: HashMap<String, ConstituentQuote>,
    pub latest_official: HashMap<String, OfficialPrice>,
}

impl EstimationContext {
    pub fn quote(&self, code: &str) -> Option<&IndicativeQuote> {
        self.quotes.get(code)
    }

    pub fn profile(&self, code: &str) -> Option<&InstrumentProfile> {
        self.profiles.get(code)
    }

    /// Best known official price to anchor synthesized or frozen values on:
    /// the quote's embedded last official wins, then the adapter's latest.
    pub fn anchor_price(&self, code: &str) -> Option<Decimal> {
        if let Some(quote) = self.quotes.get(code) {
            if let Some(nav) = quote.last_official_price {
                if nav > Decimal::ZERO {
                    return Some(nav);
                }
            }
        }
        self.latest_official
            .get(code)
            .filter(|official| official.price > Decimal::ZERO)
            .map(|official| official.price)
    }
}
