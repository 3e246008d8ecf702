use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::errors::Result;
use crate::portfolio::portfolio_model::{HistoryPoint, PortfolioHistoryPoint, RealtimeView};
use crate::valuation::EstimateResult;

/// Trait for the realtime portfolio view
#[async_trait]
pub trait PortfolioServiceTrait: Send + Sync {
    /// Replays positions as of `as_of` (today when `None`) and prices them
    /// through the valuation router.
    async fn realtime_view(&self, as_of: Option<NaiveDate>) -> Result<RealtimeView>;

    /// Same view built from estimates the caller already fetched, so one
    /// batch can feed both per-instrument samples and the portfolio total.
    fn realtime_view_from_estimates(
        &self,
        as_of: NaiveDate,
        estimates: &HashMap<String, EstimateResult>,
    ) -> Result<RealtimeView>;
}

/// Trait for close-price history read off the daily ledger
pub trait HistoryServiceTrait: Send + Sync {
    fn instrument_history(&self, instrument_code: &str, days_back: u32)
        -> Result<Vec<HistoryPoint>>;
    fn portfolio_history(&self, days_back: u32) -> Result<Vec<PortfolioHistoryPoint>>;
}
