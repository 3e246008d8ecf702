use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::SettleStatus;

/// One holding in the realtime view: replayed position joined with its
/// current estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimePositionView {
    pub instrument_code: String,
    pub display_name: String,
    pub shares: Decimal,
    pub avg_cost: Decimal,
    pub realized_gain: Decimal,
    pub estimated_price: Decimal,
    pub estimated_change_pct: Decimal,
    pub method: String,
    pub confidence: f64,
    pub warning: Option<String>,
    pub as_of_time: Option<DateTime<Utc>>,
    pub cost: Decimal,
    pub value: Decimal,
    pub gain: Decimal,
    pub gain_pct: Decimal,
}

/// Value-weighted totals over the realtime view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    pub total_cost: Decimal,
    pub total_value: Decimal,
    pub total_gain: Decimal,
    pub total_gain_pct: Decimal,
    /// Share of total value backed by a live (positive) estimate.
    pub coverage_value_pct: Decimal,
}

impl PortfolioTotals {
    pub fn zero() -> Self {
        Self {
            total_cost: Decimal::ZERO,
            total_value: Decimal::ZERO,
            total_gain: Decimal::ZERO,
            total_gain_pct: Decimal::ZERO,
            coverage_value_pct: Decimal::ZERO,
        }
    }
}

/// Point-in-time portfolio view: every open position priced by the
/// valuation router, plus totals. Positions are sorted by instrument code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeView {
    pub as_of: NaiveDate,
    pub positions: Vec<RealtimePositionView>,
    pub totals: PortfolioTotals,
}

impl RealtimeView {
    pub fn empty(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            positions: Vec::new(),
            totals: PortfolioTotals::zero(),
        }
    }
}

/// Which close a history point carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceSource {
    Official,
    Estimated,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Official => "official",
            PriceSource::Estimated => "estimated",
        }
    }
}

/// Daily close for one instrument: official once settled, the frozen
/// estimate until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub ledger_date: NaiveDate,
    pub price: Decimal,
    pub source: PriceSource,
    pub settle_status: SettleStatus,
}

/// Daily portfolio aggregate over the ledger. Official figures are only
/// used when every row that day is settled; otherwise the whole day is
/// valued on estimates and tagged as such.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioHistoryPoint {
    pub ledger_date: NaiveDate,
    pub total_cost: Decimal,
    pub total_value: Decimal,
    pub total_gain: Decimal,
    pub total_gain_pct: Decimal,
    pub source: PriceSource,
    pub settle_status: SettleStatus,
}
