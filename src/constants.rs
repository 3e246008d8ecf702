/// Synthetic intraday/analytics target aggregating all positions
pub const PORTFOLIO_TARGET: &str = "portfolio";

/// Decimal precision for valuation calculations
pub const DECIMAL_PRECISION: u32 = 6;

/// Share quantities below this are treated as zero
pub const QUANTITY_EPSILON: &str = "0.000000001";

/// Realized-gain deltas below this are not worth a compensating entry
pub const GAIN_EPSILON: &str = "0.000001";
