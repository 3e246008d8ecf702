use async_trait::async_trait;
use chrono::NaiveDate;
use num_traits::Zero;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::DECIMAL_PRECISION;
use crate::errors::Result;
use crate::portfolio::portfolio_model::{PortfolioTotals, RealtimePositionView, RealtimeView};
use crate::portfolio::portfolio_traits::PortfolioServiceTrait;
use crate::snapshot::SnapshotServiceTrait;
use crate::trading_calendar;
use crate::valuation::{EstimateResult, ValuationServiceTrait};

/// Joins replayed positions with live estimates into one priced view.
pub struct PortfolioService {
    snapshot_service: Arc<dyn SnapshotServiceTrait>,
    valuation_service: Arc<dyn ValuationServiceTrait>,
}

impl PortfolioService {
    pub fn new(
        snapshot_service: Arc<dyn SnapshotServiceTrait>,
        valuation_service: Arc<dyn ValuationServiceTrait>,
    ) -> Self {
        Self {
            snapshot_service,
            valuation_service,
        }
    }

    fn build_view(
        &self,
        as_of: NaiveDate,
        estimates: &HashMap<String, EstimateResult>,
    ) -> Result<RealtimeView> {
        let snapshot = self.snapshot_service.positions_as_of(as_of)?;
        if snapshot.is_empty() {
            return Ok(RealtimeView::empty(as_of));
        }

        let mut positions: Vec<RealtimePositionView> =
            Vec::with_capacity(snapshot.positions.len());
        let mut total_cost = Decimal::zero();
        let mut total_value = Decimal::zero();
        let mut total_gain = Decimal::zero();
        let mut covered_value = Decimal::zero();

        for position in snapshot.positions.values() {
            let estimate = estimates.get(&position.instrument_code);
            let estimated_price = estimate.map(|e| e.estimated_price).unwrap_or(Decimal::zero());

            let cost = position.cost_basis();
            let value = position.shares_end * estimated_price;
            let gain = value - cost + position.realized_gain_end;
            let gain_pct = if cost > Decimal::zero() {
                (gain / cost * Decimal::ONE_HUNDRED).round_dp(DECIMAL_PRECISION)
            } else {
                Decimal::zero()
            };

            total_cost += cost;
            total_value += value;
            total_gain += gain;
            if estimated_price > Decimal::zero() {
                covered_value += value;
            }

            positions.push(RealtimePositionView {
                instrument_code: position.instrument_code.clone(),
                display_name: estimate
                    .map(|e| e.display_name.clone())
                    .unwrap_or_else(|| position.instrument_code.clone()),
                shares: position.shares_end,
                avg_cost: position.avg_cost_end,
                realized_gain: position.realized_gain_end,
                estimated_price,
                estimated_change_pct: estimate
                    .map(|e| e.estimated_change_pct)
                    .unwrap_or(Decimal::zero()),
                method: estimate.map(|e| e.method.clone()).unwrap_or_default(),
                confidence: estimate.map(|e| e.confidence).unwrap_or(0.0),
                warning: match estimate {
                    Some(e) => e.warning.clone(),
                    None => Some("no estimate available".to_string()),
                },
                as_of_time: estimate.map(|e| e.as_of_time),
                cost,
                value,
                gain,
                gain_pct,
            });
        }

        positions.sort_by(|a, b| a.instrument_code.cmp(&b.instrument_code));

        let total_gain_pct = if total_cost > Decimal::zero() {
            (total_gain / total_cost * Decimal::ONE_HUNDRED).round_dp(DECIMAL_PRECISION)
        } else {
            Decimal::zero()
        };
        let coverage_value_pct = if total_value > Decimal::zero() {
            (covered_value / total_value * Decimal::ONE_HUNDRED).round_dp(2)
        } else {
            Decimal::zero()
        };

        Ok(RealtimeView {
            as_of,
            positions,
            totals: PortfolioTotals {
                total_cost,
                total_value,
                total_gain,
                total_gain_pct,
                coverage_value_pct,
            },
        })
    }
}

#[async_trait]
impl PortfolioServiceTrait for PortfolioService {
    async fn realtime_view(&self, as_of: Option<NaiveDate>) -> Result<RealtimeView> {
        let as_of = as_of.unwrap_or_else(trading_calendar::market_date);

        let snapshot = self.snapshot_service.positions_as_of(as_of)?;
        if snapshot.is_empty() {
            return Ok(RealtimeView::empty(as_of));
        }
        let estimates = self
            .valuation_service
            .estimate_many(&snapshot.instrument_codes())
            .await?;
        self.build_view(as_of, &estimates)
    }

    fn realtime_view_from_estimates(
        &self,
        as_of: NaiveDate,
        estimates: &HashMap<String, EstimateResult>,
    ) -> Result<RealtimeView> {
        self.build_view(as_of, estimates)
    }
}
