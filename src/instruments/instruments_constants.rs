/// Profile came from the instrument-profile adapter
pub const PROFILE_SOURCE_PROVIDER: &str = "provider";

/// Profile was pieced together from a quote plus code heuristics
pub const PROFILE_SOURCE_QUOTE_FALLBACK: &str = "quote_fallback";

pub const CATEGORY_ETF: &str = "ETF";

/// Exchange code prefixes that almost always denote exchange-traded,
/// passively tracked funds. Conservative: misses are fine, false positives
/// are not, because a passive flag short-circuits holdings synthesis.
pub const PASSIVE_TRACKER_CODE_PREFIXES: [&str; 14] = [
    "510", "511", "512", "513", "515", "516", "517", "518", "588", "159", "560", "561", "562",
    "563",
];
