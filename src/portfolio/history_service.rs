use chrono::{Days, NaiveDate};
use num_traits::Zero;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constants::DECIMAL_PRECISION;
use crate::errors::Result;
use crate::ledger::{DailyLedgerRow, LedgerRepositoryTrait, SettleStatus};
use crate::portfolio::portfolio_model::{HistoryPoint, PortfolioHistoryPoint, PriceSource};
use crate::portfolio::portfolio_traits::HistoryServiceTrait;
use crate::trading_calendar;

/// Serves daily close history straight off the ledger. A settled row
/// contributes its official price; a pending one contributes the frozen
/// estimate, tagged so callers can render it differently.
pub struct HistoryService {
    ledger_repository: Arc<dyn LedgerRepositoryTrait>,
}

impl HistoryService {
    pub fn new(ledger_repository: Arc<dyn LedgerRepositoryTrait>) -> Self {
        Self { ledger_repository }
    }

    /// Window covering the last `days_back` calendar days, today included.
    fn window(days_back: u32) -> (NaiveDate, NaiveDate) {
        let today = trading_calendar::market_date();
        let start = today
            .checked_sub_days(Days::new(days_back.saturating_sub(1) as u64))
            .unwrap_or(today);
        (start, today)
    }
}

fn row_price(row: &DailyLedgerRow) -> (Decimal, PriceSource) {
    match (row.is_settled(), row.official_close_price) {
        (true, Some(official)) => (official, PriceSource::Official),
        _ => (row.estimated_close_price, PriceSource::Estimated),
    }
}

impl HistoryServiceTrait for HistoryService {
    fn instrument_history(
        &self,
        instrument_code: &str,
        days_back: u32,
    ) -> Result<Vec<HistoryPoint>> {
        let code = instrument_code.trim();
        if code.is_empty() || days_back == 0 {
            return Ok(Vec::new());
        }

        let (start, end) = Self::window(days_back);
        let rows = self
            .ledger_repository
            .rows_for_instrument_since(code, start)?;

        Ok(rows
            .iter()
            .filter(|row| row.ledger_date <= end)
            .map(|row| {
                let (price, source) = row_price(row);
                HistoryPoint {
                    ledger_date: row.ledger_date,
                    price,
                    source,
                    settle_status: row.settle_status,
                }
            })
            .collect())
    }

    fn portfolio_history(&self, days_back: u32) -> Result<Vec<PortfolioHistoryPoint>> {
        if days_back == 0 {
            return Ok(Vec::new());
        }

        let (start, end) = Self::window(days_back);
        let rows = self.ledger_repository.rows_since(start)?;

        let mut by_date: BTreeMap<NaiveDate, Vec<DailyLedgerRow>> = BTreeMap::new();
        for row in rows {
            if row.ledger_date <= end {
                by_date.entry(row.ledger_date).or_default().push(row);
            }
        }

        let mut out = Vec::with_capacity(by_date.len());
        for (date, day_rows) in by_date {
            // One pending instrument downgrades the whole day to estimates;
            // mixing the two close kinds in one total would be misleading.
            let all_settled = day_rows
                .iter()
                .all(|r| r.is_settled() && r.official_close_price.is_some());

            let mut total_cost = Decimal::zero();
            let mut total_value = Decimal::zero();
            let mut total_gain = Decimal::zero();

            for row in &day_rows {
                let price = if all_settled {
                    row.official_close_price.unwrap_or(row.estimated_close_price)
                } else {
                    row.estimated_close_price
                };
                let cost = row.shares_end * row.avg_cost_end;
                let value = row.shares_end * price;
                total_cost += cost;
                total_value += value;
                total_gain += value - cost + row.realized_gain_end;
            }

            let total_gain_pct = if total_cost > Decimal::zero() {
                (total_gain / total_cost * Decimal::ONE_HUNDRED).round_dp(DECIMAL_PRECISION)
            } else {
                Decimal::zero()
            };

            out.push(PortfolioHistoryPoint {
                ledger_date: date,
                total_cost,
                total_value,
                total_gain,
                total_gain_pct,
                source: if all_settled {
                    PriceSource::Official
                } else {
                    PriceSource::Estimated
                },
                settle_status: if all_settled {
                    SettleStatus::Settled
                } else {
                    SettleStatus::EstimatedOnly
                },
            });
        }
        Ok(out)
    }
}
