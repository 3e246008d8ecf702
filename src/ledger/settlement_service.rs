use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::errors::{Error, Result};
use crate::ledger::ledger_errors::LedgerError;
use crate::ledger::ledger_model::{close_gain, DailyLedgerRow};
use crate::ledger::ledger_traits::{LedgerRepositoryTrait, SettlementServiceTrait};
use crate::market_data::QuoteProvider;
use crate::snapshot::SnapshotServiceTrait;
use crate::trading_calendar;
use crate::valuation::ValuationServiceTrait;

/// Drives each (date, instrument) ledger row through its life cycle:
/// estimate frozen at the close, official close overlaid once published.
///
/// `finalize_estimate` rebuilds a day from journal truth; `settle_day`
/// upgrades pending rows when the authoritative price for exactly that day
/// becomes available. Unpublished prices are not errors, just rows left for
/// the next retry.
pub struct SettlementService {
    ledger_repository: Arc<dyn LedgerRepositoryTrait>,
    snapshot_service: Arc<dyn SnapshotServiceTrait>,
    valuation_service: Arc<dyn ValuationServiceTrait>,
    quote_provider: Arc<dyn QuoteProvider>,
}

impl SettlementService {
    pub fn new(
        ledger_repository: Arc<dyn LedgerRepositoryTrait>,
        snapshot_service: Arc<dyn SnapshotServiceTrait>,
        valuation_service: Arc<dyn ValuationServiceTrait>,
        quote_provider: Arc<dyn QuoteProvider>,
    ) -> Self {
        Self {
            ledger_repository,
            snapshot_service,
            valuation_service,
            quote_provider,
        }
    }

    fn window_start(days_back: u32) -> NaiveDate {
        let today = trading_calendar::market_date();
        today
            .checked_sub_days(Days::new(days_back.saturating_sub(1) as u64))
            .unwrap_or(today)
    }
}

#[async_trait]
impl SettlementServiceTrait for SettlementService {
    async fn finalize_estimate(&self, date: NaiveDate) -> Result<usize> {
        let snapshot = self.snapshot_service.positions_as_of(date)?;
        if !snapshot.warnings.is_empty() {
            warn!(
                "Replay produced {} warning(s) while finalizing {}",
                snapshot.warnings.len(),
                date
            );
        }
        if snapshot.is_empty() {
            // Nothing held as of this date. Leave whatever the ledger has;
            // pruning only makes sense against a non-empty snapshot.
            debug!("No positions as of {}; ledger left untouched", date);
            return Ok(0);
        }

        let codes = snapshot.instrument_codes();
        let estimates = self.valuation_service.estimate_many(&codes).await?;

        let mut rows: Vec<DailyLedgerRow> = Vec::with_capacity(snapshot.positions.len());
        for position in snapshot.positions.values() {
            // A missing estimate freezes the row at zero; the row is still
            // written so settlement can upgrade it later.
            let estimated_price = estimates
                .get(&position.instrument_code)
                .map(|e| e.estimated_price)
                .unwrap_or(Decimal::ZERO);
            rows.push(DailyLedgerRow::estimated(date, position, estimated_price));
        }

        let written = self.ledger_repository.upsert_day_estimates(date, rows).await?;
        info!("Finalized estimated close for {}: {} row(s)", date, written);
        Ok(written)
    }

    async fn settle_day(&self, date: NaiveDate) -> Result<usize> {
        let rows = self.ledger_repository.rows_for_date(date)?;
        let mut settled = 0usize;

        for row in rows.into_iter().filter(|r| !r.is_settled()) {
            let official = match self
                .quote_provider
                .fetch_official_price(&row.instrument_code, date)
                .await
            {
                Ok(Some(price)) if price > Decimal::ZERO => price,
                Ok(_) => {
                    debug!(
                        "Official close for {} on {} not published yet",
                        row.instrument_code, date
                    );
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Official close fetch failed for {} on {}: {}",
                        row.instrument_code, date, e
                    );
                    continue;
                }
            };

            let official_gain = close_gain(
                row.shares_end,
                row.avg_cost_end,
                row.realized_gain_end,
                official,
            );
            match self
                .ledger_repository
                .mark_settled(date, &row.instrument_code, official, official_gain)
                .await
            {
                Ok(_) => settled += 1,
                // Lost a race with another settle pass; the row is done.
                Err(Error::Ledger(LedgerError::AlreadySettled(msg))) => debug!("{}", msg),
                Err(e) => return Err(e),
            }
        }

        if settled > 0 {
            info!("Settled {} ledger row(s) for {}", settled, date);
        }
        Ok(settled)
    }

    async fn settle_pending_days(&self, days_back: u32) -> Result<usize> {
        let today = trading_calendar::market_date();
        let mut total = 0usize;

        for offset in 0..days_back {
            let Some(day) = today.checked_sub_days(Days::new(offset as u64)) else {
                break;
            };
            total += self.settle_day(day).await?;
        }
        Ok(total)
    }

    fn count_pending(&self, days_back: u32) -> Result<i64> {
        let today = trading_calendar::market_date();
        self.ledger_repository
            .count_pending_between(Self::window_start(days_back), today)
    }

    fn get_ledger_row(
        &self,
        date: NaiveDate,
        instrument_code: &str,
    ) -> Result<Option<DailyLedgerRow>> {
        self.ledger_repository.get_row(date, instrument_code)
    }

    fn list_ledger_rows(&self) -> Result<Vec<DailyLedgerRow>> {
        self.ledger_repository.list_rows()
    }

    async fn remove_instrument_history(&self, instrument_code: &str) -> Result<usize> {
        self.ledger_repository
            .remove_instrument_history(instrument_code)
            .await
    }
}
