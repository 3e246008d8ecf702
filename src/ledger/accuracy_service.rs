use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constants::DECIMAL_PRECISION;
use crate::errors::Result;
use crate::ledger::ledger_constants::DEFAULT_HIT_THRESHOLD_PCT;
use crate::ledger::ledger_model::{
    AccuracySummary, DailyLedgerRow, GapRow, PortfolioAccuracySummary, PortfolioGapRow,
};
use crate::ledger::ledger_traits::{AccuracyServiceTrait, LedgerRepositoryTrait};
use crate::trading_calendar;
use crate::utils::parse_decimal_tolerant;

/// Read-side analytics over settled ledger rows: how far each frozen
/// estimate landed from the official close.
///
/// Everything here is a pure aggregation; nothing is written back.
pub struct AccuracyService {
    ledger_repository: Arc<dyn LedgerRepositoryTrait>,
    hit_threshold_pct: Decimal,
}

impl AccuracyService {
    pub fn new(ledger_repository: Arc<dyn LedgerRepositoryTrait>) -> Self {
        Self {
            ledger_repository,
            hit_threshold_pct: parse_decimal_tolerant(
                DEFAULT_HIT_THRESHOLD_PCT,
                "DEFAULT_HIT_THRESHOLD_PCT",
            ),
        }
    }

    /// Overrides the |gap_pct| threshold under which an estimate counts as
    /// a hit.
    pub fn with_hit_threshold(mut self, threshold_pct: Decimal) -> Self {
        self.hit_threshold_pct = threshold_pct;
        self
    }

    fn window_start(days_back: u32) -> NaiveDate {
        let today = trading_calendar::market_date();
        today
            .checked_sub_days(Days::new(days_back as u64))
            .unwrap_or(today)
    }

    fn gap_row(row: &DailyLedgerRow) -> Option<GapRow> {
        if !row.is_settled() {
            return None;
        }
        let official = row.official_close_price?;
        // A zero estimate means the close was frozen blind; comparing
        // against it would be noise.
        if row.estimated_close_price <= Decimal::ZERO {
            return None;
        }

        let gap = official - row.estimated_close_price;
        let gap_pct = ((official / row.estimated_close_price - Decimal::ONE)
            * Decimal::ONE_HUNDRED)
            .round_dp(DECIMAL_PRECISION);
        Some(GapRow {
            ledger_date: row.ledger_date,
            estimated_close_price: row.estimated_close_price,
            official_close_price: official,
            gap,
            gap_pct,
            abs_gap_pct: gap_pct.abs(),
        })
    }

    /// (mean |gap_pct|, max |gap_pct|, hit rate %) over a non-empty series.
    fn aggregate(&self, abs_gaps: &[Decimal]) -> (Decimal, Decimal, Decimal) {
        let count = Decimal::from(abs_gaps.len());
        let mean = (abs_gaps.iter().copied().sum::<Decimal>() / count).round_dp(DECIMAL_PRECISION);
        let max = abs_gaps.iter().copied().max().unwrap_or(Decimal::ZERO);
        let hits = abs_gaps
            .iter()
            .filter(|g| **g <= self.hit_threshold_pct)
            .count();
        let hit_rate = (Decimal::from(hits) / count * Decimal::ONE_HUNDRED).round_dp(2);
        (mean, max, hit_rate)
    }
}

impl AccuracyServiceTrait for AccuracyService {
    fn instrument_gap_rows(&self, instrument_code: &str, days_back: u32) -> Result<Vec<GapRow>> {
        let code = instrument_code.trim();
        if code.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .ledger_repository
            .rows_for_instrument_since(code, Self::window_start(days_back))?;
        Ok(rows.iter().filter_map(Self::gap_row).collect())
    }

    fn instrument_gap_summary(
        &self,
        instrument_code: &str,
        days_back: u32,
    ) -> Result<AccuracySummary> {
        let rows = self.instrument_gap_rows(instrument_code, days_back)?;
        if rows.is_empty() {
            return Ok(AccuracySummary {
                count: 0,
                mean_abs_gap_pct: None,
                max_abs_gap_pct: None,
                hit_rate_pct: None,
                threshold_pct: self.hit_threshold_pct,
                latest: None,
            });
        }

        let abs_gaps: Vec<Decimal> = rows.iter().map(|r| r.abs_gap_pct).collect();
        let (mean, max, hit_rate) = self.aggregate(&abs_gaps);
        Ok(AccuracySummary {
            count: rows.len(),
            mean_abs_gap_pct: Some(mean),
            max_abs_gap_pct: Some(max),
            hit_rate_pct: Some(hit_rate),
            threshold_pct: self.hit_threshold_pct,
            latest: rows.last().cloned(),
        })
    }

    fn portfolio_gap_rows(&self, days_back: u32) -> Result<Vec<PortfolioGapRow>> {
        let rows = self.ledger_repository.rows_since(Self::window_start(days_back))?;

        let mut by_date: BTreeMap<NaiveDate, Vec<DailyLedgerRow>> = BTreeMap::new();
        for row in rows {
            by_date.entry(row.ledger_date).or_default().push(row);
        }

        let mut out = Vec::new();
        for (date, day_rows) in by_date {
            // Every instrument must be settled before the day counts;
            // mixing official and estimated values in one total would make
            // the gap meaningless.
            let all_settled = day_rows
                .iter()
                .all(|r| r.is_settled() && r.official_close_price.is_some());
            if !all_settled {
                continue;
            }

            let mut estimated_value = Decimal::ZERO;
            let mut official_value = Decimal::ZERO;
            for row in &day_rows {
                estimated_value += row.shares_end * row.estimated_close_price;
                if let Some(official) = row.official_close_price {
                    official_value += row.shares_end * official;
                }
            }
            if estimated_value <= Decimal::ZERO {
                continue;
            }

            let gap = official_value - estimated_value;
            let gap_pct = ((official_value / estimated_value - Decimal::ONE)
                * Decimal::ONE_HUNDRED)
                .round_dp(DECIMAL_PRECISION);
            out.push(PortfolioGapRow {
                ledger_date: date,
                estimated_value,
                official_value,
                gap,
                gap_pct,
                abs_gap_pct: gap_pct.abs(),
            });
        }
        Ok(out)
    }

    fn portfolio_gap_summary(&self, days_back: u32) -> Result<PortfolioAccuracySummary> {
        let rows = self.portfolio_gap_rows(days_back)?;
        if rows.is_empty() {
            return Ok(PortfolioAccuracySummary {
                count: 0,
                mean_abs_gap_pct: None,
                max_abs_gap_pct: None,
                hit_rate_pct: None,
                threshold_pct: self.hit_threshold_pct,
                latest: None,
            });
        }

        let abs_gaps: Vec<Decimal> = rows.iter().map(|r| r.abs_gap_pct).collect();
        let (mean, max, hit_rate) = self.aggregate(&abs_gaps);
        Ok(PortfolioAccuracySummary {
            count: rows.len(),
            mean_abs_gap_pct: Some(mean),
            max_abs_gap_pct: Some(max),
            hit_rate_pct: Some(hit_rate),
            threshold_pct: self.hit_threshold_pct,
            latest: rows.last().cloned(),
        })
    }
}
