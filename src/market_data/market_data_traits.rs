use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::market_data_errors::Result;
use super::market_data_model::{
    ConstituentQuote, HoldingsDisclosure, IndicativeQuote, OfficialPrice, ProfileData,
};

/// Quote adapter contract. Implementations live outside this crate (network
/// clients, fixtures); the core only consumes them. Every method is expected
/// to bound its own latency — callers treat failures as "source unavailable"
/// and degrade, they never retry inline.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Best-effort real-time quote for one instrument.
    async fn fetch_indicative_quote(&self, code: &str) -> Result<IndicativeQuote>;

    /// Batched variant; instruments the provider knows nothing about are
    /// simply absent from the map.
    async fn fetch_indicative_quotes(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, IndicativeQuote>>;

    /// Live quotes for holdings constituents, keyed by constituent code.
    async fn fetch_constituent_quotes(
        &self,
        codes: &[String],
    ) -> Result<HashMap<String, ConstituentQuote>>;

    /// Authoritative end-of-day price for exactly `date`, or `None` when the
    /// administrator has not published it yet.
    async fn fetch_official_price(&self, code: &str, date: NaiveDate)
        -> Result<Option<Decimal>>;

    /// Most recent published official price, any date.
    async fn fetch_latest_official_price(&self, code: &str) -> Result<Option<OfficialPrice>>;
}

/// Profile adapter contract: static instrument metadata and holdings
/// disclosures. `None` means the provider has no record, which callers
/// treat the same as a fetch failure (fall back to heuristics).
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn fetch_instrument_profile(&self, code: &str) -> Result<Option<ProfileData>>;

    async fn fetch_holdings(&self, code: &str) -> Result<Option<HoldingsDisclosure>>;
}
