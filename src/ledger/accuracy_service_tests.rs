use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

use crate::db::StoreHandle;
use crate::ledger::accuracy_service::AccuracyService;
use crate::ledger::ledger_model::{close_gain, DailyLedgerRow};
use crate::ledger::ledger_repository::LedgerRepository;
use crate::ledger::ledger_traits::{AccuracyServiceTrait, LedgerRepositoryTrait};
use crate::snapshot::PositionSnapshot;
use crate::trading_calendar;

fn setup() -> (TempDir, Arc<LedgerRepository>, AccuracyService) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = StoreHandle::open(dir.path().to_str().unwrap(), "test-account")
        .expect("failed to open store");
    let ledger = Arc::new(LedgerRepository::new(
        store.pool(),
        store.writer(),
        store.account_id(),
    ));
    let service = AccuracyService::new(ledger.clone());
    (dir, ledger, service)
}

fn days_ago(n: u64) -> NaiveDate {
    trading_calendar::market_date()
        .checked_sub_days(Days::new(n))
        .unwrap()
}

fn position(code: &str, shares: Decimal, avg_cost: Decimal) -> PositionSnapshot {
    let mut p = PositionSnapshot::new(code);
    p.shares_end = shares;
    p.avg_cost_end = avg_cost;
    p
}

/// Seeds one ledger day with estimate rows: (code, shares, estimated price).
async fn seed_day(
    ledger: &LedgerRepository,
    date: NaiveDate,
    entries: &[(&str, Decimal, Decimal)],
) {
    let rows: Vec<DailyLedgerRow> = entries
        .iter()
        .map(|(code, shares, est)| {
            DailyLedgerRow::estimated(date, &position(code, *shares, *est), *est)
        })
        .collect();
    ledger
        .upsert_day_estimates(date, rows)
        .await
        .expect("seed failed");
}

async fn settle(ledger: &LedgerRepository, date: NaiveDate, code: &str, official: Decimal) {
    let row = ledger
        .get_row(date, code)
        .unwrap()
        .expect("row to settle missing");
    let gain = close_gain(row.shares_end, row.avg_cost_end, row.realized_gain_end, official);
    ledger
        .mark_settled(date, code, official, gain)
        .await
        .expect("settle failed");
}

#[tokio::test]
async fn test_instrument_gap_rows_cover_settled_rows_only() {
    let (_dir, ledger, service) = setup();

    seed_day(&ledger, days_ago(3), &[("510300", dec!(1000), dec!(4.00))]).await;
    seed_day(&ledger, days_ago(2), &[("510300", dec!(1000), dec!(4.10))]).await;
    seed_day(&ledger, days_ago(1), &[("510300", dec!(1000), dec!(2.00))]).await;

    // Day -2 never settles.
    settle(&ledger, days_ago(3), "510300", dec!(4.01)).await;
    settle(&ledger, days_ago(1), "510300", dec!(1.99)).await;

    let rows = service.instrument_gap_rows("510300", 60).unwrap();
    assert_eq!(rows.len(), 2);

    // Ascending by date: oldest first.
    assert_eq!(rows[0].ledger_date, days_ago(3));
    // 4.01/4.00 - 1 = 0.25%
    assert_eq!(rows[0].gap, dec!(0.01));
    assert_eq!(rows[0].gap_pct, dec!(0.25));

    assert_eq!(rows[1].ledger_date, days_ago(1));
    // 1.99/2.00 - 1 = -0.5%
    assert_eq!(rows[1].gap_pct, dec!(-0.5));
    assert_eq!(rows[1].abs_gap_pct, dec!(0.5));
}

#[tokio::test]
async fn test_instrument_summary_statistics() {
    let (_dir, ledger, service) = setup();

    seed_day(&ledger, days_ago(3), &[("510300", dec!(1000), dec!(4.00))]).await;
    seed_day(&ledger, days_ago(1), &[("510300", dec!(1000), dec!(2.00))]).await;
    settle(&ledger, days_ago(3), "510300", dec!(4.01)).await;
    settle(&ledger, days_ago(1), "510300", dec!(1.99)).await;

    let summary = service.instrument_gap_summary("510300", 60).unwrap();
    assert_eq!(summary.count, 2);
    // (0.25 + 0.5) / 2
    assert_eq!(summary.mean_abs_gap_pct, Some(dec!(0.375)));
    assert_eq!(summary.max_abs_gap_pct, Some(dec!(0.5)));
    // Only the 0.25 row is within the 0.30 threshold.
    assert_eq!(summary.hit_rate_pct, Some(dec!(50.00)));
    assert_eq!(summary.latest.unwrap().ledger_date, days_ago(1));
}

#[tokio::test]
async fn test_summary_empty_when_nothing_settled() {
    let (_dir, ledger, service) = setup();

    seed_day(&ledger, days_ago(1), &[("510300", dec!(1000), dec!(4.00))]).await;

    let summary = service.instrument_gap_summary("510300", 60).unwrap();
    assert_eq!(summary.count, 0);
    assert!(summary.mean_abs_gap_pct.is_none());
    assert!(summary.hit_rate_pct.is_none());
    assert!(summary.latest.is_none());
}

#[tokio::test]
async fn test_zero_estimate_rows_are_skipped() {
    let (_dir, ledger, service) = setup();

    // Blind freeze: estimate 0, later settled with a real official.
    seed_day(&ledger, days_ago(1), &[("510300", dec!(1000), Decimal::ZERO)]).await;
    settle(&ledger, days_ago(1), "510300", dec!(4.01)).await;

    assert!(service.instrument_gap_rows("510300", 60).unwrap().is_empty());
}

#[tokio::test]
async fn test_window_excludes_old_rows() {
    let (_dir, ledger, service) = setup();

    seed_day(&ledger, days_ago(120), &[("510300", dec!(1000), dec!(4.00))]).await;
    seed_day(&ledger, days_ago(1), &[("510300", dec!(1000), dec!(4.00))]).await;
    settle(&ledger, days_ago(120), "510300", dec!(4.01)).await;
    settle(&ledger, days_ago(1), "510300", dec!(4.01)).await;

    let rows = service.instrument_gap_rows("510300", 60).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ledger_date, days_ago(1));

    // Widening the window brings the old row back.
    assert_eq!(service.instrument_gap_rows("510300", 180).unwrap().len(), 2);
}

#[tokio::test]
async fn test_portfolio_requires_every_row_settled() {
    let (_dir, ledger, service) = setup();

    // Day -2: both instruments settled.
    seed_day(
        &ledger,
        days_ago(2),
        &[
            ("510300", dec!(100), dec!(4.00)),
            ("159915", dec!(50), dec!(2.00)),
        ],
    )
    .await;
    settle(&ledger, days_ago(2), "510300", dec!(4.01)).await;
    settle(&ledger, days_ago(2), "159915", dec!(2.02)).await;

    // Day -1: one of the two still pending.
    seed_day(
        &ledger,
        days_ago(1),
        &[
            ("510300", dec!(100), dec!(4.00)),
            ("159915", dec!(50), dec!(2.00)),
        ],
    )
    .await;
    settle(&ledger, days_ago(1), "510300", dec!(4.01)).await;

    let rows = service.portfolio_gap_rows(60).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ledger_date, days_ago(2));

    // est = 100*4.00 + 50*2.00 = 500; off = 100*4.01 + 50*2.02 = 502
    assert_eq!(rows[0].estimated_value, dec!(500.00));
    assert_eq!(rows[0].official_value, dec!(502.00));
    assert_eq!(rows[0].gap, dec!(2.00));
    // 502/500 - 1 = 0.4%
    assert_eq!(rows[0].gap_pct, dec!(0.4));
}

#[tokio::test]
async fn test_portfolio_summary_aggregates() {
    let (_dir, ledger, service) = setup();

    seed_day(&ledger, days_ago(2), &[("510300", dec!(100), dec!(4.00))]).await;
    settle(&ledger, days_ago(2), "510300", dec!(4.01)).await;
    seed_day(&ledger, days_ago(1), &[("510300", dec!(100), dec!(4.00))]).await;
    settle(&ledger, days_ago(1), "510300", dec!(4.04)).await;

    let summary = service.portfolio_gap_summary(60).unwrap();
    assert_eq!(summary.count, 2);
    // Gaps: 0.25% (hit at the 0.30 threshold) and 1% (miss).
    assert_eq!(summary.hit_rate_pct, Some(dec!(50.00)));
    assert_eq!(summary.max_abs_gap_pct, Some(dec!(1)));
    assert_eq!(summary.latest.unwrap().ledger_date, days_ago(1));
}

#[tokio::test]
async fn test_portfolio_summary_empty() {
    let (_dir, _ledger, service) = setup();
    let summary = service.portfolio_gap_summary(60).unwrap();
    assert_eq!(summary.count, 0);
    assert!(summary.latest.is_none());
}

#[tokio::test]
async fn test_custom_hit_threshold() {
    let (_dir, ledger, _) = setup();

    seed_day(&ledger, days_ago(1), &[("510300", dec!(1000), dec!(2.00))]).await;
    settle(&ledger, days_ago(1), "510300", dec!(1.99)).await;

    // |gap| = 0.5%: a miss at the default threshold, a hit at 1%.
    let strict = AccuracyService::new(ledger.clone());
    assert_eq!(
        strict.instrument_gap_summary("510300", 60).unwrap().hit_rate_pct,
        Some(dec!(0.00))
    );

    let loose = AccuracyService::new(ledger.clone()).with_hit_threshold(dec!(1.0));
    assert_eq!(
        loose.instrument_gap_summary("510300", 60).unwrap().hit_rate_pct,
        Some(dec!(100.00))
    );
}
