use std::time::Duration;

use crate::ledger::DEFAULT_SETTLE_DAYS_BACK;

/// Tunables for the sampling loop. The defaults sample once a minute while
/// the market is open, wake every five minutes outside sessions so the close
/// and settlement windows are never slept through, and refresh off-market
/// quotes at most every half hour.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Gap between iterations while the market is open.
    pub trading_interval: Duration,
    /// Gap between iterations outside market hours.
    pub idle_interval: Duration,
    /// Minimum gap between off-market quote refreshes. Iterations in between
    /// skip the fetch entirely.
    pub off_market_refresh_interval: Duration,
    /// Half-width of the close-marker window around the 15:00 close.
    pub close_window_minutes: u32,
    /// Local hour at which the nightly settlement window opens.
    pub settlement_window_start_hour: u32,
    /// Local hour at which it closes; no settlement attempts run past it
    /// until the next day.
    pub settlement_deadline_hour: u32,
    /// Minimum gap between settlement attempts inside the window.
    pub settlement_backoff: Duration,
    /// How many days back each settlement sweep covers.
    pub settle_days_back: u32,
    /// Explicit instrument set. `None` resolves from the watchlist.
    pub instrument_codes: Option<Vec<String>>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            trading_interval: Duration::from_secs(60),
            idle_interval: Duration::from_secs(300),
            off_market_refresh_interval: Duration::from_secs(1800),
            close_window_minutes: 2,
            settlement_window_start_hour: 19,
            settlement_deadline_hour: 23,
            settlement_backoff: Duration::from_secs(30 * 60),
            settle_days_back: DEFAULT_SETTLE_DAYS_BACK,
            instrument_codes: None,
        }
    }
}
