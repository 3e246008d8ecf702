/// Row carries only the frozen estimate; the official close is still pending
pub const SETTLE_STATUS_ESTIMATED_ONLY: &str = "ESTIMATED_ONLY";

/// Terminal state: the official close has been applied
pub const SETTLE_STATUS_SETTLED: &str = "SETTLED";

/// Default trailing window for settlement retries, in calendar days
pub const DEFAULT_SETTLE_DAYS_BACK: u32 = 7;

/// Default trailing window for accuracy aggregation, in calendar days
pub const DEFAULT_ACCURACY_WINDOW_DAYS: u32 = 60;

/// Default |gap_pct| at or under which an estimate counts as a hit
pub const DEFAULT_HIT_THRESHOLD_PCT: &str = "0.30";
