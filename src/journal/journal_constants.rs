/// Adjustment kinds
///
/// Purchase of fund shares. Increases shares, re-weights average cost.
pub const KIND_BUY: &str = "BUY";

/// Disposal of fund shares. Decreases shares, realizes gain against average cost.
pub const KIND_SELL: &str = "SELL";

/// Direct realized-gain adjustment (dividends, corrections). Shares untouched.
pub const KIND_CASH_ADJUSTMENT: &str = "CASH_ADJUSTMENT";

/// Provenance tags
///
/// Entry recorded by the user.
pub const PROVENANCE_MANUAL: &str = "manual";

/// Entry generated by the position edit bridge; the only kind the bridge may
/// delete and rewrite.
pub const PROVENANCE_SYSTEM_EDIT: &str = "system_edit";
