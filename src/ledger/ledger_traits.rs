use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::Result;
use crate::ledger::ledger_model::{
    AccuracySummary, DailyLedgerRow, GapRow, PortfolioAccuracySummary, PortfolioGapRow,
};

/// Trait for the daily ledger store
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    fn get_row(&self, date: NaiveDate, instrument_code: &str) -> Result<Option<DailyLedgerRow>>;
    fn rows_for_date(&self, date: NaiveDate) -> Result<Vec<DailyLedgerRow>>;
    fn rows_since(&self, since: NaiveDate) -> Result<Vec<DailyLedgerRow>>;
    fn rows_for_instrument_since(
        &self,
        instrument_code: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailyLedgerRow>>;
    fn list_rows(&self) -> Result<Vec<DailyLedgerRow>>;
    fn count_pending_between(&self, start: NaiveDate, end: NaiveDate) -> Result<i64>;

    /// Writes one day's estimate rows in a single transaction: settled rows
    /// keep their estimate and official figures (only position fields move),
    /// everything else is replaced, and rows for instruments missing from
    /// `rows` are pruned off that date.
    async fn upsert_day_estimates(
        &self,
        date: NaiveDate,
        rows: Vec<DailyLedgerRow>,
    ) -> Result<usize>;

    /// Applies the official close to a pending row and flips it to SETTLED.
    /// Errors with `AlreadySettled` when the row is settled and `NotFound`
    /// when there is no row at all.
    async fn mark_settled(
        &self,
        date: NaiveDate,
        instrument_code: &str,
        official_price: Decimal,
        official_gain: Decimal,
    ) -> Result<DailyLedgerRow>;

    async fn remove_instrument_history(&self, instrument_code: &str) -> Result<usize>;
}

/// Trait for the settlement engine
#[async_trait]
pub trait SettlementServiceTrait: Send + Sync {
    async fn finalize_estimate(&self, date: NaiveDate) -> Result<usize>;
    async fn settle_day(&self, date: NaiveDate) -> Result<usize>;
    async fn settle_pending_days(&self, days_back: u32) -> Result<usize>;
    fn count_pending(&self, days_back: u32) -> Result<i64>;
    fn get_ledger_row(&self, date: NaiveDate, instrument_code: &str)
        -> Result<Option<DailyLedgerRow>>;
    fn list_ledger_rows(&self) -> Result<Vec<DailyLedgerRow>>;
    async fn remove_instrument_history(&self, instrument_code: &str) -> Result<usize>;
}

/// Trait for estimate-vs-official accuracy analytics
pub trait AccuracyServiceTrait: Send + Sync {
    fn instrument_gap_rows(&self, instrument_code: &str, days_back: u32) -> Result<Vec<GapRow>>;
    fn instrument_gap_summary(&self, instrument_code: &str, days_back: u32)
        -> Result<AccuracySummary>;
    fn portfolio_gap_rows(&self, days_back: u32) -> Result<Vec<PortfolioGapRow>>;
    fn portfolio_gap_summary(&self, days_back: u32) -> Result<PortfolioAccuracySummary>;
}
