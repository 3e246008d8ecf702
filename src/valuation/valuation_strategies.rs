use chrono::Duration;
use rust_decimal::Decimal;

use crate::constants::DECIMAL_PRECISION;
use crate::instruments::InstrumentProfile;
use crate::market_data::{normalize_constituent_code, IndicativeQuote};
use crate::valuation::valuation_constants::*;
use crate::valuation::valuation_model::{EstimateResult, EstimationContext};

/// One tier of the valuation chain. A tier answers `None` when it does not
/// apply so the router falls through to the next one; only the frozen tier
/// always answers.
pub trait EstimationStrategy: Send + Sync {
    fn estimate(
        &self,
        code: &str,
        display_name: &str,
        profile: &InstrumentProfile,
        ctx: &EstimationContext,
    ) -> Option<EstimateResult>;
}

/// A quote is usable live when it has a positive price and, during market
/// hours, is fresher than the staleness window. Off-market the last session
/// quote stays valid however old it is.
fn quote_is_active(quote: &IndicativeQuote, ctx: &EstimationContext) -> bool {
    if !quote.has_live_price() {
        return false;
    }
    if !ctx.in_market_hours {
        return true;
    }
    ctx.now.signed_duration_since(quote.as_of_time) <= Duration::seconds(QUOTE_STALENESS_SECONDS)
}

fn live_quote_result(
    code: &str,
    display_name: &str,
    quote: &IndicativeQuote,
    method: &str,
) -> EstimateResult {
    EstimateResult {
        instrument_code: code.to_string(),
        display_name: display_name.to_string(),
        estimated_price: quote.price,
        estimated_change_pct: quote.change_pct,
        method: method.to_string(),
        confidence: CONFIDENCE_LIVE_QUOTE,
        as_of_time: quote.as_of_time,
        warning: None,
        suggested_poll_secs: POLL_SECS_LIVE,
        coverage_pct: None,
    }
}

/// Tier 1: passively tracked instruments priced straight from their own
/// indicative quote.
pub struct PassiveTrackerStrategy;

impl EstimationStrategy for PassiveTrackerStrategy {
    fn estimate(
        &self,
        code: &str,
        display_name: &str,
        profile: &InstrumentProfile,
        ctx: &EstimationContext,
    ) -> Option<EstimateResult> {
        if !profile.is_passively_tracked {
            return None;
        }
        let quote = ctx.quote(code)?;
        if !quote_is_active(quote, ctx) {
            return None;
        }
        Some(live_quote_result(
            code,
            display_name,
            quote,
            METHOD_ETF_INDICATIVE,
        ))
    }
}

/// Tier 2: price synthesized from constituent quotes weighted by the
/// disclosed holdings. Uncovered constituents contribute zero change but
/// stay in the denominator, so thin coverage dilutes toward zero rather
/// than overstating the move.
pub struct HoldingsSynthesisStrategy;

impl EstimationStrategy for HoldingsSynthesisStrategy {
    fn estimate(
        &self,
        code: &str,
        display_name: &str,
        profile: &InstrumentProfile,
        ctx: &EstimationContext,
    ) -> Option<EstimateResult> {
        if profile.is_cross_border {
            return None;
        }
        let disclosure = ctx.holdings.get(code)?;
        if disclosure.holdings.is_empty() {
            return None;
        }

        let mut total_weight = Decimal::ZERO;
        let mut covered_weight = Decimal::ZERO;
        let mut weighted_sum = Decimal::ZERO;

        for holding in &disclosure.holdings {
            if holding.weight_pct <= Decimal::ZERO {
                continue;
            }
            total_weight += holding.weight_pct;

            let key = normalize_constituent_code(&holding.constituent_code);
            if key.is_empty() {
                continue;
            }
            if let Some(constituent) = ctx.constituent_quotes.get(&key) {
                covered_weight += holding.weight_pct;
                weighted_sum += holding.weight_pct * constituent.change_pct;
            }
        }

        if total_weight <= Decimal::ZERO || covered_weight <= Decimal::ZERO {
            return None;
        }

        let weighted_pct = (weighted_sum / total_weight).round_dp(DECIMAL_PRECISION);
        let coverage = (covered_weight / total_weight * Decimal::ONE_HUNDRED).round_dp(2);

        // Without an official anchor there is nothing to scale the move by.
        let base = ctx.anchor_price(code)?;
        let estimated_price =
            (base * (Decimal::ONE + weighted_pct / Decimal::ONE_HUNDRED)).round_dp(DECIMAL_PRECISION);

        let (confidence, poll_secs) = if coverage >= Decimal::from(COVERAGE_HIGH_PCT) {
            (CONFIDENCE_HOLDINGS_HIGH, POLL_SECS_LIVE)
        } else if coverage >= Decimal::from(COVERAGE_MEDIUM_PCT) {
            (CONFIDENCE_HOLDINGS_MEDIUM, POLL_SECS_MEDIUM)
        } else {
            (CONFIDENCE_HOLDINGS_LOW, POLL_SECS_LOW)
        };

        let mut notes: Vec<String> = Vec::new();
        if coverage < Decimal::from(COVERAGE_WARN_BELOW_PCT) {
            notes.push(format!("holdings coverage low ({}%)", coverage.round_dp(1)));
        }
        if let Some(as_of) = disclosure.as_of {
            notes.push(format!("holdings as of {}", as_of));
        }
        let warning = if notes.is_empty() {
            None
        } else {
            Some(notes.join("; "))
        };

        Some(EstimateResult {
            instrument_code: code.to_string(),
            display_name: display_name.to_string(),
            estimated_price,
            estimated_change_pct: weighted_pct,
            method: METHOD_HOLDINGS_WEIGHTED.to_string(),
            confidence,
            as_of_time: ctx.now,
            warning,
            suggested_poll_secs: poll_secs,
            coverage_pct: Some(coverage),
        })
    }
}

/// Tier 3: the plain indicative quote, for instruments that fell through the
/// tiers above but still have a live quote.
pub struct IndicativeFallbackStrategy;

impl EstimationStrategy for IndicativeFallbackStrategy {
    fn estimate(
        &self,
        code: &str,
        display_name: &str,
        _profile: &InstrumentProfile,
        ctx: &EstimationContext,
    ) -> Option<EstimateResult> {
        let quote = ctx.quote(code)?;
        if !quote_is_active(quote, ctx) {
            return None;
        }
        Some(live_quote_result(
            code,
            display_name,
            quote,
            METHOD_INDICATIVE_QUOTE,
        ))
    }
}

/// Tier 4, terminal: carry the last official price forward with zero change.
/// Always answers, possibly with a zero price when nothing is known at all.
pub struct FrozenStrategy;

impl EstimationStrategy for FrozenStrategy {
    fn estimate(
        &self,
        code: &str,
        display_name: &str,
        _profile: &InstrumentProfile,
        ctx: &EstimationContext,
    ) -> Option<EstimateResult> {
        let price = ctx.anchor_price(code).unwrap_or(Decimal::ZERO);
        let warning = if price > Decimal::ZERO {
            "live estimate unavailable; holding last official price"
        } else {
            "no live estimate or official price available"
        };

        Some(EstimateResult {
            instrument_code: code.to_string(),
            display_name: display_name.to_string(),
            estimated_price: price,
            estimated_change_pct: Decimal::ZERO,
            method: METHOD_FROZEN_OFFICIAL.to_string(),
            confidence: CONFIDENCE_FROZEN,
            as_of_time: ctx
                .quote(code)
                .map(|q| q.as_of_time)
                .unwrap_or(ctx.now),
            warning: Some(warning.to_string()),
            suggested_poll_secs: POLL_SECS_FROZEN,
            coverage_pct: None,
        })
    }
}

/// The default chain, in fallback order.
pub fn default_strategy_chain() -> Vec<Box<dyn EstimationStrategy>> {
    vec![
        Box::new(PassiveTrackerStrategy),
        Box::new(HoldingsSynthesisStrategy),
        Box::new(IndicativeFallbackStrategy),
        Box::new(FrozenStrategy),
    ]
}
