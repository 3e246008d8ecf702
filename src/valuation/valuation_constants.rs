/// Passive tracker priced straight from its indicative quote
pub const METHOD_ETF_INDICATIVE: &str = "ETF_INDICATIVE";

/// Price synthesized from constituent quotes weighted by disclosed holdings
pub const METHOD_HOLDINGS_WEIGHTED: &str = "HOLDINGS_WEIGHTED";

/// Plain indicative quote for a non-passive instrument
pub const METHOD_INDICATIVE_QUOTE: &str = "INDICATIVE_QUOTE";

/// Last known official price, carried forward with zero change
pub const METHOD_FROZEN_OFFICIAL: &str = "FROZEN_OFFICIAL";

/// During market hours a quote older than this is treated as dead
pub const QUOTE_STALENESS_SECONDS: i64 = 5 * 60;

// Poll hints returned with each estimate, in seconds.
pub const POLL_SECS_LIVE: u64 = 10;
pub const POLL_SECS_MEDIUM: u64 = 20;
pub const POLL_SECS_LOW: u64 = 30;
pub const POLL_SECS_FROZEN: u64 = 60;

pub const CONFIDENCE_LIVE_QUOTE: f64 = 0.9;
pub const CONFIDENCE_HOLDINGS_HIGH: f64 = 0.75;
pub const CONFIDENCE_HOLDINGS_MEDIUM: f64 = 0.55;
pub const CONFIDENCE_HOLDINGS_LOW: f64 = 0.35;
pub const CONFIDENCE_FROZEN: f64 = 0.3;

// Holdings coverage ladder, in percent of disclosed weight.
pub const COVERAGE_HIGH_PCT: u32 = 80;
pub const COVERAGE_MEDIUM_PCT: u32 = 50;
pub const COVERAGE_WARN_BELOW_PCT: u32 = 60;
