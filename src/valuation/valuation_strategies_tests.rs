use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::instruments::InstrumentProfile;
use crate::market_data::{
    ConstituentQuote, HoldingWeight, HoldingsDisclosure, IndicativeQuote, OfficialPrice,
};
use crate::valuation::valuation_constants::*;
use crate::valuation::valuation_model::EstimationContext;
use crate::valuation::valuation_strategies::{
    EstimationStrategy, FrozenStrategy, HoldingsSynthesisStrategy, IndicativeFallbackStrategy,
    PassiveTrackerStrategy,
};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 21, 2, 0, 0).unwrap()
}

fn empty_ctx(in_market_hours: bool) -> EstimationContext {
    EstimationContext {
        now: fixed_now(),
        in_market_hours,
        quotes: HashMap::new(),
        profiles: HashMap::new(),
        holdings: HashMap::new(),
        constituent_quotes: HashMap::new(),
        latest_official: HashMap::new(),
    }
}

fn profile(code: &str, passive: bool, cross_border: bool) -> InstrumentProfile {
    InstrumentProfile {
        code: code.to_string(),
        display_name: format!("{} fund", code),
        category: None,
        is_passively_tracked: passive,
        is_cross_border: cross_border,
        tracked_index: None,
        source: "provider".to_string(),
        updated_at: fixed_now(),
    }
}

fn quote(
    code: &str,
    price: Decimal,
    change_pct: Decimal,
    age_secs: i64,
    last_official: Option<Decimal>,
) -> IndicativeQuote {
    IndicativeQuote {
        code: code.to_string(),
        display_name: format!("{} fund", code),
        price,
        change_pct,
        as_of_time: fixed_now() - Duration::seconds(age_secs),
        last_official_price: last_official,
    }
}

fn disclosure(code: &str, weights: &[(&str, Decimal)]) -> HoldingsDisclosure {
    HoldingsDisclosure {
        code: code.to_string(),
        as_of: None,
        holdings: weights
            .iter()
            .map(|(c, w)| HoldingWeight {
                constituent_code: c.to_string(),
                weight_pct: *w,
            })
            .collect(),
    }
}

#[test]
fn test_passive_tier_uses_fresh_quote() {
    let mut ctx = empty_ctx(true);
    ctx.quotes.insert(
        "510300".to_string(),
        quote("510300", dec!(4.52), dec!(0.44), 30, None),
    );

    let result = PassiveTrackerStrategy
        .estimate("510300", "CSI 300", &profile("510300", true, false), &ctx)
        .expect("tier should apply");

    assert_eq!(result.method, METHOD_ETF_INDICATIVE);
    assert_eq!(result.estimated_price, dec!(4.52));
    assert_eq!(result.estimated_change_pct, dec!(0.44));
    assert_eq!(result.confidence, CONFIDENCE_LIVE_QUOTE);
    assert_eq!(result.suggested_poll_secs, POLL_SECS_LIVE);
    assert!(result.warning.is_none());
}

#[test]
fn test_passive_tier_rejects_stale_quote_during_market_hours() {
    let mut ctx = empty_ctx(true);
    ctx.quotes.insert(
        "510300".to_string(),
        quote("510300", dec!(4.52), dec!(0.44), QUOTE_STALENESS_SECONDS + 1, None),
    );

    let result =
        PassiveTrackerStrategy.estimate("510300", "CSI 300", &profile("510300", true, false), &ctx);
    assert!(result.is_none());
}

#[test]
fn test_stale_quote_is_fine_outside_market_hours() {
    let mut ctx = empty_ctx(false);
    ctx.quotes.insert(
        "510300".to_string(),
        quote("510300", dec!(4.52), dec!(0.44), 3 * 60 * 60, None),
    );

    let result =
        PassiveTrackerStrategy.estimate("510300", "CSI 300", &profile("510300", true, false), &ctx);
    assert!(result.is_some());
}

#[test]
fn test_passive_tier_skips_non_passive() {
    let mut ctx = empty_ctx(true);
    ctx.quotes.insert(
        "000991".to_string(),
        quote("000991", dec!(1.80), dec!(0.2), 10, None),
    );

    let result =
        PassiveTrackerStrategy.estimate("000991", "Active", &profile("000991", false, false), &ctx);
    assert!(result.is_none());

    // But the indicative fallback tier picks it up.
    let result = IndicativeFallbackStrategy
        .estimate("000991", "Active", &profile("000991", false, false), &ctx)
        .expect("fallback should apply");
    assert_eq!(result.method, METHOD_INDICATIVE_QUOTE);
    assert_eq!(result.confidence, CONFIDENCE_LIVE_QUOTE);
}

#[test]
fn test_holdings_full_coverage() {
    let mut ctx = empty_ctx(true);
    ctx.quotes.insert(
        "001594".to_string(),
        quote("001594", dec!(0), dec!(0), 10, Some(dec!(4.0))),
    );
    ctx.holdings.insert(
        "001594".to_string(),
        disclosure("001594", &[("sh600519", dec!(60)), ("sz000858", dec!(40))]),
    );
    ctx.constituent_quotes.insert(
        "600519".to_string(),
        ConstituentQuote {
            code: "600519".to_string(),
            price: dec!(1500),
            change_pct: dec!(1),
        },
    );
    ctx.constituent_quotes.insert(
        "000858".to_string(),
        ConstituentQuote {
            code: "000858".to_string(),
            price: dec!(130),
            change_pct: dec!(-1),
        },
    );

    let result = HoldingsSynthesisStrategy
        .estimate("001594", "Mixed", &profile("001594", false, false), &ctx)
        .expect("tier should apply");

    assert_eq!(result.method, METHOD_HOLDINGS_WEIGHTED);
    // (60*1 + 40*(-1)) / 100 = 0.2
    assert_eq!(result.estimated_change_pct, dec!(0.2));
    assert_eq!(result.estimated_price, dec!(4.008));
    assert_eq!(result.coverage_pct, Some(dec!(100.00)));
    assert_eq!(result.confidence, CONFIDENCE_HOLDINGS_HIGH);
    assert!(result.warning.is_none());
}

#[test]
fn test_holdings_low_coverage_warns_and_dilutes() {
    let mut ctx = empty_ctx(true);
    ctx.quotes.insert(
        "001594".to_string(),
        quote("001594", dec!(0), dec!(0), 10, Some(dec!(2.0))),
    );
    let mut d = disclosure("001594", &[("sh600519", dec!(40)), ("sz300750", dec!(60))]);
    d.as_of = Some(chrono::NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    ctx.holdings.insert("001594".to_string(), d);
    // Only the 40% constituent has a quote.
    ctx.constituent_quotes.insert(
        "600519".to_string(),
        ConstituentQuote {
            code: "600519".to_string(),
            price: dec!(1500),
            change_pct: dec!(2),
        },
    );

    let result = HoldingsSynthesisStrategy
        .estimate("001594", "Mixed", &profile("001594", false, false), &ctx)
        .expect("tier should apply");

    // Uncovered weight stays in the denominator: 40*2/100 = 0.8
    assert_eq!(result.estimated_change_pct, dec!(0.8));
    assert_eq!(result.coverage_pct, Some(dec!(40.00)));
    assert_eq!(result.confidence, CONFIDENCE_HOLDINGS_LOW);
    assert_eq!(result.suggested_poll_secs, POLL_SECS_LOW);
    let warning = result.warning.expect("low coverage must warn");
    assert!(warning.contains("coverage low"), "warning was: {}", warning);
    assert!(warning.contains("2026-06-30"), "warning was: {}", warning);
}

#[test]
fn test_holdings_medium_coverage_confidence() {
    let mut ctx = empty_ctx(true);
    ctx.quotes.insert(
        "001594".to_string(),
        quote("001594", dec!(0), dec!(0), 10, Some(dec!(2.0))),
    );
    ctx.holdings.insert(
        "001594".to_string(),
        disclosure("001594", &[("sh600519", dec!(65)), ("sz300750", dec!(35))]),
    );
    ctx.constituent_quotes.insert(
        "600519".to_string(),
        ConstituentQuote {
            code: "600519".to_string(),
            price: dec!(1500),
            change_pct: dec!(1),
        },
    );

    let result = HoldingsSynthesisStrategy
        .estimate("001594", "Mixed", &profile("001594", false, false), &ctx)
        .expect("tier should apply");

    assert_eq!(result.coverage_pct, Some(dec!(65.00)));
    assert_eq!(result.confidence, CONFIDENCE_HOLDINGS_MEDIUM);
    assert_eq!(result.suggested_poll_secs, POLL_SECS_MEDIUM);
    // 65% is above the warn line, below high confidence.
    assert!(result.warning.is_none());
}

#[test]
fn test_holdings_tier_skips_cross_border() {
    let mut ctx = empty_ctx(true);
    ctx.holdings.insert(
        "513500".to_string(),
        disclosure("513500", &[("AAPL", dec!(7))]),
    );

    let result = HoldingsSynthesisStrategy.estimate(
        "513500",
        "Feeder",
        &profile("513500", false, true),
        &ctx,
    );
    assert!(result.is_none());
}

#[test]
fn test_holdings_tier_needs_an_anchor_price() {
    let mut ctx = empty_ctx(true);
    ctx.holdings.insert(
        "001594".to_string(),
        disclosure("001594", &[("sh600519", dec!(60))]),
    );
    ctx.constituent_quotes.insert(
        "600519".to_string(),
        ConstituentQuote {
            code: "600519".to_string(),
            price: dec!(1500),
            change_pct: dec!(1),
        },
    );

    // No quote, no latest official: nothing to scale from.
    let result = HoldingsSynthesisStrategy.estimate(
        "001594",
        "Mixed",
        &profile("001594", false, false),
        &ctx,
    );
    assert!(result.is_none());
}

#[test]
fn test_frozen_with_no_data_at_all() {
    let ctx = empty_ctx(true);

    let result = FrozenStrategy
        .estimate("510300", "CSI 300", &profile("510300", true, false), &ctx)
        .expect("frozen always answers");

    assert_eq!(result.method, METHOD_FROZEN_OFFICIAL);
    assert_eq!(result.estimated_price, Decimal::ZERO);
    assert_eq!(result.estimated_change_pct, Decimal::ZERO);
    assert_eq!(result.confidence, CONFIDENCE_FROZEN);
    assert_eq!(result.suggested_poll_secs, POLL_SECS_FROZEN);
    assert!(result.warning.is_some());
}

#[test]
fn test_frozen_prefers_embedded_official_then_adapter_latest() {
    let mut ctx = empty_ctx(true);
    ctx.quotes.insert(
        "510300".to_string(),
        quote("510300", dec!(0), dec!(0), 600, Some(dec!(4.41))),
    );
    ctx.latest_official.insert(
        "510300".to_string(),
        OfficialPrice {
            code: "510300".to_string(),
            price_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
            price: dec!(4.39),
        },
    );

    let result = FrozenStrategy
        .estimate("510300", "CSI 300", &profile("510300", true, false), &ctx)
        .unwrap();
    assert_eq!(result.estimated_price, dec!(4.41));

    // Without the embedded value the adapter's latest official is used.
    ctx.quotes.insert(
        "510300".to_string(),
        quote("510300", dec!(0), dec!(0), 600, None),
    );
    let result = FrozenStrategy
        .estimate("510300", "CSI 300", &profile("510300", true, false), &ctx)
        .unwrap();
    assert_eq!(result.estimated_price, dec!(4.39));
}
