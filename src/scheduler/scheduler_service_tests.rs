use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::constants::PORTFOLIO_TARGET;
use crate::db::StoreHandle;
use crate::errors::{Error, Result};
use crate::intraday::{IntradayRepository, IntradayService, IntradayServiceTrait};
use crate::journal::{JournalRepository, JournalRepositoryTrait, NewAdjustment};
use crate::ledger::{DailyLedgerRow, SettlementServiceTrait};
use crate::market_data::MarketDataError;
use crate::portfolio::PortfolioService;
use crate::scheduler::scheduler_config::SchedulerConfig;
use crate::scheduler::scheduler_service::{LoopState, SchedulerService};
use crate::scheduler::scheduler_status::SchedulerPhase;
use crate::snapshot::SnapshotService;
use crate::valuation::{EstimateResult, ValuationServiceTrait, METHOD_ETF_INDICATIVE};
use crate::watchlist::{WatchlistRepository, WatchlistService, WatchlistServiceTrait};

/// Valuation with a scripted price table, a batch counter, and a failure
/// switch for fault-isolation tests.
struct ScriptedValuation {
    prices: Mutex<HashMap<String, Decimal>>,
    batches: AtomicU32,
    fail: AtomicBool,
}

impl ScriptedValuation {
    fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            batches: AtomicU32::new(0),
            fail: AtomicBool::new(false),
        }
    }

    fn set_price(&self, code: &str, price: Decimal) {
        self.prices
            .lock()
            .unwrap()
            .insert(code.to_string(), price);
    }

    fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn batch_count(&self) -> u32 {
        self.batches.load(Ordering::SeqCst)
    }

    fn estimate(&self, code: &str) -> Option<EstimateResult> {
        self.prices
            .lock()
            .unwrap()
            .get(code)
            .map(|price| EstimateResult {
                instrument_code: code.to_string(),
                display_name: format!("{} fund", code),
                estimated_price: *price,
                estimated_change_pct: dec!(0.5),
                method: METHOD_ETF_INDICATIVE.to_string(),
                confidence: 0.9,
                as_of_time: Utc::now(),
                warning: None,
                suggested_poll_secs: 10,
                coverage_pct: None,
            })
    }
}

#[async_trait]
impl ValuationServiceTrait for ScriptedValuation {
    async fn estimate_one(&self, code: &str) -> Result<EstimateResult> {
        self.estimate(code).ok_or_else(|| {
            Error::MarketData(MarketDataError::NotFound(code.to_string()))
        })
    }

    async fn estimate_many(&self, codes: &[String]) -> Result<HashMap<String, EstimateResult>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::MarketData(MarketDataError::ProviderError(
                "quote feed down".to_string(),
            )));
        }
        Ok(codes
            .iter()
            .filter_map(|c| self.estimate(c).map(|e| (c.clone(), e)))
            .collect())
    }
}

/// Settlement engine stub: `count_pending` answers from a settable counter,
/// a sweep drains it and reports the drained rows as settled.
struct MockSettlement {
    pending: AtomicI64,
    probes: AtomicU32,
    sweeps: AtomicU32,
}

impl MockSettlement {
    fn new() -> Self {
        Self {
            pending: AtomicI64::new(0),
            probes: AtomicU32::new(0),
            sweeps: AtomicU32::new(0),
        }
    }

    fn set_pending(&self, count: i64) {
        self.pending.store(count, Ordering::SeqCst);
    }

    fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    fn sweep_count(&self) -> u32 {
        self.sweeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettlementServiceTrait for MockSettlement {
    async fn finalize_estimate(&self, _date: NaiveDate) -> Result<usize> {
        Ok(0)
    }

    async fn settle_day(&self, _date: NaiveDate) -> Result<usize> {
        Ok(0)
    }

    async fn settle_pending_days(&self, _days_back: u32) -> Result<usize> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        Ok(self.pending.swap(0, Ordering::SeqCst) as usize)
    }

    fn count_pending(&self, _days_back: u32) -> Result<i64> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.pending.load(Ordering::SeqCst))
    }

    fn get_ledger_row(
        &self,
        _date: NaiveDate,
        _instrument_code: &str,
    ) -> Result<Option<DailyLedgerRow>> {
        Ok(None)
    }

    fn list_ledger_rows(&self) -> Result<Vec<DailyLedgerRow>> {
        Ok(Vec::new())
    }

    async fn remove_instrument_history(&self, _instrument_code: &str) -> Result<usize> {
        Ok(0)
    }
}

struct Fixture {
    _dir: TempDir,
    journal: Arc<JournalRepository>,
    intraday: Arc<IntradayService>,
    watchlist: Arc<WatchlistService>,
    portfolio: Arc<PortfolioService>,
    valuation: Arc<ScriptedValuation>,
    settlement: Arc<MockSettlement>,
}

fn setup() -> Fixture {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store = StoreHandle::open(dir.path().to_str().unwrap(), "test-account")
        .expect("failed to open store");

    let journal = Arc::new(JournalRepository::new(
        store.pool(),
        store.writer(),
        store.account_id(),
    ));
    let intraday = Arc::new(IntradayService::new(Arc::new(IntradayRepository::new(
        store.pool(),
        store.writer(),
        store.account_id(),
    ))));
    let watchlist = Arc::new(WatchlistService::new(Arc::new(WatchlistRepository::new(
        store.pool(),
        store.writer(),
        store.account_id(),
    ))));
    let valuation = Arc::new(ScriptedValuation::new());
    let portfolio = Arc::new(PortfolioService::new(
        Arc::new(SnapshotService::new(journal.clone())),
        valuation.clone(),
    ));

    Fixture {
        _dir: dir,
        journal,
        intraday,
        watchlist,
        portfolio,
        valuation,
        settlement: Arc::new(MockSettlement::new()),
    }
}

fn scheduler_with(fx: &Fixture, config: SchedulerConfig) -> SchedulerService {
    SchedulerService::new(
        config,
        fx.valuation.clone(),
        fx.portfolio.clone(),
        fx.intraday.clone(),
        fx.watchlist.clone(),
        fx.settlement.clone(),
    )
}

// 2026-08-17 is a Monday.
fn monday_at(hour: u32, minute: u32) -> DateTime<Tz> {
    Shanghai
        .with_ymd_and_hms(2026, 8, 17, hour, minute, 0)
        .unwrap()
}

fn monday() -> NaiveDate {
    monday_at(12, 0).date_naive()
}

async fn seed_position(fx: &Fixture, code: &str, shares: Decimal, price: Decimal) {
    fx.journal
        .append(NewAdjustment::buy(code, monday(), shares, price))
        .await
        .expect("seed failed");
}

#[tokio::test]
async fn test_market_hours_sampling_writes_instrument_and_portfolio_points() {
    let fx = setup();
    seed_position(&fx, "510300", dec!(1000), dec!(4.00)).await;
    fx.valuation.set_price("510300", dec!(4.40));
    // On the watchlist, but the explicit list must win.
    fx.watchlist.add("159915").await.unwrap();

    let config = SchedulerConfig {
        instrument_codes: Some(vec!["  510300  ".to_string(), "   ".to_string()]),
        ..SchedulerConfig::default()
    };
    let trading_interval = config.trading_interval;
    let scheduler = scheduler_with(&fx, config);
    let mut state = LoopState::default();

    let interval = scheduler.run_iteration(&mut state, monday_at(10, 0)).await;
    assert_eq!(interval, trading_interval);

    let samples = fx
        .intraday
        .get_samples("510300", Some(monday()), None)
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].estimated_price, Some(dec!(4.40)));
    assert_eq!(samples[0].method.as_deref(), Some(METHOD_ETF_INDICATIVE));

    let portfolio = fx
        .intraday
        .get_samples(PORTFOLIO_TARGET, Some(monday()), None)
        .unwrap();
    assert_eq!(portfolio.len(), 1);
    assert_eq!(portfolio[0].total_value, Some(dec!(4400)));
    assert_eq!(portfolio[0].total_gain, Some(dec!(400)));

    // The watchlist code was never sampled.
    assert!(fx
        .intraday
        .get_samples("159915", Some(monday()), None)
        .unwrap()
        .is_empty());

    let status = scheduler.status();
    assert_eq!(status.phase, SchedulerPhase::Sampled);
    assert_eq!(status.instrument_count, 1);
    assert_eq!(status.samples_written, 2);
    assert_eq!(status.sample_date, Some(monday()));
}

#[tokio::test]
async fn test_instrument_set_resolves_from_watchlist() {
    let fx = setup();
    seed_position(&fx, "510300", dec!(500), dec!(4.00)).await;
    fx.valuation.set_price("510300", dec!(4.10));
    fx.watchlist.add("510300").await.unwrap();

    let scheduler = scheduler_with(&fx, SchedulerConfig::default());
    let mut state = LoopState::default();
    scheduler.run_iteration(&mut state, monday_at(13, 30)).await;

    assert_eq!(
        fx.intraday
            .get_samples("510300", Some(monday()), None)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(scheduler.status().instrument_count, 1);
    assert_eq!(scheduler.status().phase, SchedulerPhase::Sampled);
}

#[tokio::test]
async fn test_empty_instrument_set_sleeps_through_the_iteration() {
    let fx = setup();
    let scheduler = scheduler_with(&fx, SchedulerConfig::default());
    let mut state = LoopState::default();

    let interval = scheduler.run_iteration(&mut state, monday_at(10, 0)).await;

    assert_eq!(scheduler.status().phase, SchedulerPhase::NoInstruments);
    assert_eq!(fx.valuation.batch_count(), 0);
    assert_eq!(interval, SchedulerConfig::default().trading_interval);
}

#[tokio::test]
async fn test_close_markers_written_once_per_target() {
    let fx = setup();
    seed_position(&fx, "510300", dec!(1000), dec!(4.00)).await;
    fx.valuation.set_price("510300", dec!(4.62));

    let config = SchedulerConfig {
        instrument_codes: Some(vec!["510300".to_string(), "159915".to_string()]),
        ..SchedulerConfig::default()
    };
    let scheduler = scheduler_with(&fx, config);
    let mut state = LoopState::default();

    // 15:01 is past the session but inside the close window.
    scheduler.run_iteration(&mut state, monday_at(15, 1)).await;

    assert!(fx
        .intraday
        .has_close_marker("510300", Some(monday()))
        .unwrap());
    assert!(fx
        .intraday
        .has_close_marker("159915", Some(monday()))
        .unwrap());
    assert!(fx
        .intraday
        .has_close_marker(PORTFOLIO_TARGET, Some(monday()))
        .unwrap());
    assert_eq!(scheduler.status().phase, SchedulerPhase::CloseMarked);
    assert_eq!(scheduler.status().markers_written, 3);

    // The unpriced code still got its marker, without a price.
    let bare = fx
        .intraday
        .get_samples("159915", Some(monday()), None)
        .unwrap();
    assert_eq!(bare.len(), 1);
    assert!(bare[0].is_close_marker());
    assert_eq!(bare[0].estimated_price, None);

    // A second pass inside the window writes nothing new.
    scheduler.run_iteration(&mut state, monday_at(15, 2)).await;
    assert_eq!(scheduler.status().markers_written, 3);
    assert_eq!(
        fx.intraday
            .get_samples("510300", Some(monday()), None)
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_off_market_refresh_is_change_driven() {
    let fx = setup();
    seed_position(&fx, "510300", dec!(1000), dec!(4.00)).await;
    fx.valuation.set_price("510300", dec!(4.40));

    let config = SchedulerConfig {
        instrument_codes: Some(vec!["510300".to_string()]),
        ..SchedulerConfig::default()
    };
    let idle_interval = config.idle_interval;
    let scheduler = scheduler_with(&fx, config);
    let mut state = LoopState::default();

    // First off-market pass has no previous point to compare against.
    let interval = scheduler.run_iteration(&mut state, monday_at(16, 0)).await;
    assert_eq!(interval, idle_interval);
    assert_eq!(scheduler.status().phase, SchedulerPhase::Refreshed);
    assert_eq!(fx.valuation.batch_count(), 1);
    assert_eq!(
        fx.intraday
            .get_samples("510300", Some(monday()), None)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        fx.intraday
            .get_samples(PORTFOLIO_TARGET, Some(monday()), None)
            .unwrap()
            .len(),
        1
    );

    // Refresh not due yet: the quote feed is not even asked.
    scheduler.run_iteration(&mut state, monday_at(16, 2)).await;
    assert_eq!(scheduler.status().phase, SchedulerPhase::OutsideTrading);
    assert_eq!(fx.valuation.batch_count(), 1);

    // Due again but the price did not move: nothing written.
    scheduler.run_iteration(&mut state, monday_at(16, 40)).await;
    assert_eq!(scheduler.status().phase, SchedulerPhase::Refreshed);
    assert_eq!(fx.valuation.batch_count(), 2);
    assert_eq!(
        fx.intraday
            .get_samples("510300", Some(monday()), None)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        fx.intraday
            .get_samples(PORTFOLIO_TARGET, Some(monday()), None)
            .unwrap()
            .len(),
        1
    );

    // Price moved: one new point per target.
    fx.valuation.set_price("510300", dec!(4.45));
    scheduler.run_iteration(&mut state, monday_at(17, 20)).await;
    assert_eq!(
        fx.intraday
            .get_samples("510300", Some(monday()), None)
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        fx.intraday
            .get_samples(PORTFOLIO_TARGET, Some(monday()), None)
            .unwrap()
            .len(),
        2
    );
    assert_eq!(scheduler.status().samples_written, 4);
}

#[tokio::test]
async fn test_nightly_settlement_respects_backoff_and_deadline() {
    let fx = setup();
    fx.settlement.set_pending(3);
    let scheduler = scheduler_with(&fx, SchedulerConfig::default());
    let mut state = LoopState::default();

    // Inside the window; the first attempt runs immediately.
    scheduler.run_iteration(&mut state, monday_at(19, 5)).await;
    assert_eq!(fx.settlement.probe_count(), 1);
    assert_eq!(fx.settlement.sweep_count(), 1);
    assert_eq!(scheduler.status().rows_settled, 3);

    // Backoff has not elapsed.
    scheduler.run_iteration(&mut state, monday_at(19, 10)).await;
    assert_eq!(fx.settlement.probe_count(), 1);

    // Backoff elapsed; nothing pending anymore, so probe only.
    scheduler.run_iteration(&mut state, monday_at(19, 40)).await;
    assert_eq!(fx.settlement.probe_count(), 2);
    assert_eq!(fx.settlement.sweep_count(), 1);
    assert_eq!(scheduler.status().rows_settled, 3);

    // Past the deadline hour: no attempts until the next day.
    scheduler.run_iteration(&mut state, monday_at(23, 30)).await;
    assert_eq!(fx.settlement.probe_count(), 2);

    // Before the window opens: still nothing, even with fresh timers.
    let mut fresh = LoopState::default();
    scheduler.run_iteration(&mut fresh, monday_at(18, 59)).await;
    assert_eq!(fx.settlement.probe_count(), 2);
}

#[tokio::test]
async fn test_quote_failure_is_isolated_to_the_iteration() {
    let fx = setup();
    seed_position(&fx, "510300", dec!(1000), dec!(4.00)).await;
    fx.valuation.set_price("510300", dec!(4.40));
    fx.valuation.set_failing(true);

    let config = SchedulerConfig {
        instrument_codes: Some(vec!["510300".to_string()]),
        ..SchedulerConfig::default()
    };
    let trading_interval = config.trading_interval;
    let scheduler = scheduler_with(&fx, config);
    let mut state = LoopState::default();

    let interval = scheduler.run_iteration(&mut state, monday_at(10, 0)).await;
    assert_eq!(interval, trading_interval);
    let status = scheduler.status();
    assert_eq!(status.phase, SchedulerPhase::Error);
    assert!(status.last_error.unwrap().contains("quote feed down"));
    assert!(fx
        .intraday
        .get_samples("510300", Some(monday()), None)
        .unwrap()
        .is_empty());

    // The next iteration recovers without any reset.
    fx.valuation.set_failing(false);
    scheduler.run_iteration(&mut state, monday_at(10, 1)).await;
    assert_eq!(scheduler.status().phase, SchedulerPhase::Sampled);
    assert_eq!(
        fx.intraday
            .get_samples("510300", Some(monday()), None)
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_spawn_and_stop_lifecycle() {
    let fx = setup();
    let config = SchedulerConfig {
        trading_interval: Duration::from_millis(10),
        idle_interval: Duration::from_millis(10),
        ..SchedulerConfig::default()
    };
    let scheduler = Arc::new(scheduler_with(&fx, config));

    let handle = scheduler.clone().spawn();
    assert!(scheduler.is_running());
    assert!(scheduler.status().running);

    tokio::time::sleep(Duration::from_millis(30)).await;
    scheduler.stop();
    handle.await.unwrap();

    assert!(!scheduler.is_running());
    assert!(!scheduler.status().running);
    assert_eq!(scheduler.status().phase, SchedulerPhase::Idle);
}
