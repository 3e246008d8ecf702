use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::errors::{Error, Result};
use crate::intraday::{IntradayServiceTrait, NewIntradayPoint};
use crate::ledger::SettlementServiceTrait;
use crate::portfolio::PortfolioServiceTrait;
use crate::scheduler::scheduler_config::SchedulerConfig;
use crate::scheduler::scheduler_status::{SchedulerPhase, SchedulerStatus, StatusHandle};
use crate::trading_calendar;
use crate::valuation::{EstimateResult, ValuationServiceTrait};
use crate::watchlist::WatchlistServiceTrait;

/// Timers owned by the loop task. Not shared; the heartbeat carries the
/// user-visible state.
#[derive(Debug, Default)]
pub(crate) struct LoopState {
    pub(crate) last_settlement_attempt: Option<DateTime<Tz>>,
    pub(crate) last_off_market_refresh: Option<DateTime<Tz>>,
}

/// The sampling loop. One long-lived task, one iteration at a time:
/// settlement retries inside the nightly window, close markers around the
/// 15:00 close, per-minute samples during sessions, change-driven refreshes
/// off hours. Every substep is fault-isolated; a failed fetch or write is
/// logged, recorded on the heartbeat, and retried next interval.
pub struct SchedulerService {
    config: SchedulerConfig,
    valuation_service: Arc<dyn ValuationServiceTrait>,
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    intraday_service: Arc<dyn IntradayServiceTrait>,
    watchlist_service: Arc<dyn WatchlistServiceTrait>,
    settlement_service: Arc<dyn SettlementServiceTrait>,
    status: StatusHandle,
    running: AtomicBool,
    stop_signal: Notify,
}

impl SchedulerService {
    pub fn new(
        config: SchedulerConfig,
        valuation_service: Arc<dyn ValuationServiceTrait>,
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        intraday_service: Arc<dyn IntradayServiceTrait>,
        watchlist_service: Arc<dyn WatchlistServiceTrait>,
        settlement_service: Arc<dyn SettlementServiceTrait>,
    ) -> Self {
        Self {
            config,
            valuation_service,
            portfolio_service,
            intraday_service,
            watchlist_service,
            settlement_service,
            status: StatusHandle::default(),
            running: AtomicBool::new(false),
            stop_signal: Notify::new(),
        }
    }

    /// Starts the loop on a background task. The caller keeps its own
    /// `Arc` for `stop` and `status`.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        self.status.update(|status| {
            status.running = true;
            status.phase = SchedulerPhase::Idle;
        });
        tokio::spawn(async move {
            info!("Sampling scheduler started");
            let mut state = LoopState::default();
            while self.running.load(Ordering::SeqCst) {
                let now = trading_calendar::now_market();
                let interval = self.run_iteration(&mut state, now).await;
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                tokio::select! {
                    _ = self.stop_signal.notified() => {}
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            self.status.update(|status| {
                status.running = false;
                status.phase = SchedulerPhase::Idle;
            });
            info!("Sampling scheduler stopped");
        })
    }

    /// Clears the running flag and wakes the loop out of its sleep.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_signal.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status.snapshot()
    }

    /// One loop pass at `now`. Returns how long to sleep before the next.
    pub(crate) async fn run_iteration(&self, state: &mut LoopState, now: DateTime<Tz>) -> Duration {
        let in_market = trading_calendar::is_market_open(&now);
        let in_close_window =
            trading_calendar::is_close_window(&now, self.config.close_window_minutes);
        let today = now.date_naive();
        let interval = if in_market {
            self.config.trading_interval
        } else {
            self.config.idle_interval
        };

        if self.in_settlement_window(&now)
            && Self::elapsed(state.last_settlement_attempt, &now, self.config.settlement_backoff)
        {
            state.last_settlement_attempt = Some(now);
            self.run_settlement().await;
        }

        let codes = match self.resolve_instruments() {
            Ok(codes) => codes,
            Err(e) => {
                warn!("Instrument set resolution failed: {}", e);
                self.status.update(|status| {
                    status.phase = SchedulerPhase::Error;
                    status.last_error = Some(e.to_string());
                });
                return interval;
            }
        };
        if codes.is_empty() {
            self.status.update(|status| {
                status.phase = SchedulerPhase::NoInstruments;
                status.sample_date = Some(today);
                status.instrument_count = 0;
            });
            return interval;
        }

        let refresh_due = Self::elapsed(
            state.last_off_market_refresh,
            &now,
            self.config.off_market_refresh_interval,
        );
        if !in_market && !in_close_window && !refresh_due {
            self.status.update(|status| {
                status.phase = SchedulerPhase::OutsideTrading;
                status.sample_date = Some(today);
                status.instrument_count = codes.len();
            });
            return interval;
        }

        // One batch fetch feeds everything below.
        let estimates = match self.valuation_service.estimate_many(&codes).await {
            Ok(estimates) => estimates,
            Err(e) => {
                warn!("Estimate batch failed: {}", e);
                self.status.update(|status| {
                    status.phase = SchedulerPhase::Error;
                    status.last_error = Some(e.to_string());
                    status.sample_date = Some(today);
                    status.instrument_count = codes.len();
                });
                return interval;
            }
        };

        if in_close_window {
            let written = self.append_close_markers(today, &codes, &estimates).await;
            self.status.update(|status| {
                status.phase = SchedulerPhase::CloseMarked;
                status.sample_date = Some(today);
                status.instrument_count = codes.len();
                status.markers_written += written;
            });
        } else if in_market {
            let written = self.record_market_samples(today, &codes, &estimates).await;
            self.status.update(|status| {
                status.phase = SchedulerPhase::Sampled;
                status.sample_date = Some(today);
                status.instrument_count = codes.len();
                status.samples_written += written;
            });
        } else {
            state.last_off_market_refresh = Some(now);
            let written = self.refresh_off_market(today, &codes, &estimates).await;
            self.status.update(|status| {
                status.phase = SchedulerPhase::Refreshed;
                status.sample_date = Some(today);
                status.instrument_count = codes.len();
                status.samples_written += written;
            });
        }
        interval
    }

    fn in_settlement_window(&self, now: &DateTime<Tz>) -> bool {
        let hour = now.hour();
        hour >= self.config.settlement_window_start_hour
            && hour < self.config.settlement_deadline_hour
    }

    fn elapsed(last: Option<DateTime<Tz>>, now: &DateTime<Tz>, min_gap: Duration) -> bool {
        match last {
            Some(at) => (*now - at).num_seconds() >= min_gap.as_secs() as i64,
            None => true,
        }
    }

    fn resolve_instruments(&self) -> Result<Vec<String>> {
        match &self.config.instrument_codes {
            Some(codes) => Ok(codes
                .iter()
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect()),
            None => self.watchlist_service.codes(),
        }
    }

    async fn run_settlement(&self) {
        self.status
            .update(|status| status.phase = SchedulerPhase::Settling);
        let pending = match self
            .settlement_service
            .count_pending(self.config.settle_days_back)
        {
            Ok(count) => count,
            Err(e) => {
                warn!("Pending-row probe failed: {}", e);
                self.record_error(&e);
                return;
            }
        };
        if pending == 0 {
            debug!("No pending ledger rows; next check after backoff");
            return;
        }
        info!("{} pending ledger row(s); running settlement sweep", pending);
        match self
            .settlement_service
            .settle_pending_days(self.config.settle_days_back)
            .await
        {
            Ok(settled) => {
                info!("Settlement sweep settled {} row(s)", settled);
                self.status
                    .update(|status| status.rows_settled += settled as u64);
            }
            Err(e) => {
                warn!("Settlement sweep failed: {}", e);
                self.record_error(&e);
            }
        }
    }

    /// Close markers for every instrument plus the portfolio target, written
    /// at most once per day each. A code with no live estimate still gets
    /// its marker; the marker records that the session ended, not a price.
    async fn append_close_markers(
        &self,
        date: NaiveDate,
        codes: &[String],
        estimates: &HashMap<String, EstimateResult>,
    ) -> u64 {
        let mut written = 0u64;
        for code in codes {
            let point = match estimates.get(code) {
                Some(estimate) => NewIntradayPoint::from_estimate(date, estimate),
                None => NewIntradayPoint::bare(date, code),
            };
            match self.intraday_service.append_close_marker(point).await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Close marker for {} failed: {}", code, e);
                    self.record_error(&e);
                }
            }
        }
        match self.portfolio_point(date, estimates) {
            Ok(Some(point)) => match self.intraday_service.append_close_marker(point).await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Portfolio close marker failed: {}", e);
                    self.record_error(&e);
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Portfolio view for close marker failed: {}", e);
                self.record_error(&e);
            }
        }
        written
    }

    async fn record_market_samples(
        &self,
        date: NaiveDate,
        codes: &[String],
        estimates: &HashMap<String, EstimateResult>,
    ) -> u64 {
        let mut written = 0u64;
        for code in codes {
            let Some(estimate) = estimates.get(code) else {
                debug!("No estimate for {}; sample skipped", code);
                continue;
            };
            let point = NewIntradayPoint::from_estimate(date, estimate);
            match self.intraday_service.record_sample(point).await {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!("Sample for {} failed: {}", code, e);
                    self.record_error(&e);
                }
            }
        }
        match self.portfolio_point(date, estimates) {
            Ok(Some(point)) => match self.intraday_service.record_sample(point).await {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!("Portfolio sample failed: {}", e);
                    self.record_error(&e);
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Portfolio view for sample failed: {}", e);
                self.record_error(&e);
            }
        }
        written
    }

    /// Off-market pass: a point is appended only when the estimate moved
    /// since the last recorded point for that target.
    async fn refresh_off_market(
        &self,
        date: NaiveDate,
        codes: &[String],
        estimates: &HashMap<String, EstimateResult>,
    ) -> u64 {
        let mut written = 0u64;
        for code in codes {
            let Some(estimate) = estimates.get(code) else {
                continue;
            };
            let unchanged = match self.intraday_service.last_sample(code, date) {
                Ok(Some(last)) => last.estimated_price == Some(estimate.estimated_price),
                Ok(None) => false,
                Err(e) => {
                    warn!("Last-sample read for {} failed: {}", code, e);
                    self.record_error(&e);
                    continue;
                }
            };
            if unchanged {
                continue;
            }
            let point = NewIntradayPoint::from_estimate(date, estimate);
            match self.intraday_service.record_sample(point).await {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!("Off-market sample for {} failed: {}", code, e);
                    self.record_error(&e);
                }
            }
        }
        if written > 0 {
            // Totals only move when some instrument moved.
            match self.portfolio_point(date, estimates) {
                Ok(Some(point)) => match self.intraday_service.record_sample(point).await {
                    Ok(()) => written += 1,
                    Err(e) => {
                        warn!("Off-market portfolio sample failed: {}", e);
                        self.record_error(&e);
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    warn!("Portfolio view for off-market sample failed: {}", e);
                    self.record_error(&e);
                }
            }
        }
        written
    }

    /// Portfolio sample off the already-fetched batch. `None` when nothing
    /// is held as of the date.
    fn portfolio_point(
        &self,
        date: NaiveDate,
        estimates: &HashMap<String, EstimateResult>,
    ) -> Result<Option<NewIntradayPoint>> {
        let view = self
            .portfolio_service
            .realtime_view_from_estimates(date, estimates)?;
        if view.positions.is_empty() {
            return Ok(None);
        }
        Ok(Some(NewIntradayPoint::from_portfolio(date, &view.totals)))
    }

    fn record_error(&self, error: &Error) {
        self.status
            .update(|status| status.last_error = Some(error.to_string()));
    }
}
