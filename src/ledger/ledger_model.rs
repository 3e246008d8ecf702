use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::DECIMAL_PRECISION;
use crate::ledger::ledger_constants::*;
use crate::snapshot::PositionSnapshot;
use crate::utils::{
    format_date, format_timestamp, parse_date_tolerant, parse_decimal_opt, parse_decimal_tolerant,
    parse_timestamp_tolerant,
};

/// Settlement state of one (date, instrument) ledger row.
///
/// The machine only moves forward: `EstimatedOnly -> Settled`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettleStatus {
    EstimatedOnly,
    Settled,
}

impl SettleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettleStatus::EstimatedOnly => SETTLE_STATUS_ESTIMATED_ONLY,
            SettleStatus::Settled => SETTLE_STATUS_SETTLED,
        }
    }
}

impl FromStr for SettleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s == SETTLE_STATUS_ESTIMATED_ONLY => Ok(SettleStatus::EstimatedOnly),
            s if s == SETTLE_STATUS_SETTLED => Ok(SettleStatus::Settled),
            _ => Err(format!("Unknown settle status: {}", s)),
        }
    }
}

/// Close gain at `price` for a position: value minus cost basis, plus the
/// realized gain carried in from the journal. The same shape is used for the
/// estimated and the official close so the two stay comparable.
pub fn close_gain(
    shares: Decimal,
    avg_cost: Decimal,
    realized_gain: Decimal,
    price: Decimal,
) -> Decimal {
    (shares * price - shares * avg_cost + realized_gain).round_dp(DECIMAL_PRECISION)
}

/// Domain model for one daily ledger row: the frozen estimated close for a
/// (date, instrument), later overlaid with the authoritative close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLedgerRow {
    pub account_id: String,
    pub ledger_date: NaiveDate,
    pub instrument_code: String,
    pub shares_end: Decimal,
    pub avg_cost_end: Decimal,
    pub realized_gain_end: Decimal,
    pub estimated_close_price: Decimal,
    pub estimated_close_gain: Decimal,
    pub official_close_price: Option<Decimal>,
    pub official_close_gain: Option<Decimal>,
    pub settle_status: SettleStatus,
    pub updated_at: DateTime<Utc>,
}

impl DailyLedgerRow {
    /// Builds a fresh estimate-only row for a replayed position. The account
    /// scope is stamped by the repository on write.
    pub fn estimated(
        ledger_date: NaiveDate,
        position: &PositionSnapshot,
        estimated_price: Decimal,
    ) -> Self {
        let estimated_gain = close_gain(
            position.shares_end,
            position.avg_cost_end,
            position.realized_gain_end,
            estimated_price,
        );
        Self {
            account_id: String::new(),
            ledger_date,
            instrument_code: position.instrument_code.clone(),
            shares_end: position.shares_end,
            avg_cost_end: position.avg_cost_end,
            realized_gain_end: position.realized_gain_end,
            estimated_close_price: estimated_price,
            estimated_close_gain: estimated_gain,
            official_close_price: None,
            official_close_gain: None,
            settle_status: SettleStatus::EstimatedOnly,
            updated_at: Utc::now(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settle_status == SettleStatus::Settled
    }
}

/// Database model for daily ledger rows. Amounts and dates are TEXT;
/// conversion happens at this boundary only.
#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::daily_ledger)]
#[diesel(primary_key(account_id, ledger_date, instrument_code))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct DailyLedgerRowDB {
    pub account_id: String,
    pub ledger_date: String,
    pub instrument_code: String,
    pub shares_end: String,
    pub avg_cost_end: String,
    pub realized_gain_end: String,
    pub estimated_close_price: String,
    pub estimated_close_gain: String,
    pub official_close_price: Option<String>,
    pub official_close_gain: Option<String>,
    pub settle_status: String,
    pub updated_at: String,
}

impl From<DailyLedgerRowDB> for DailyLedgerRow {
    fn from(db: DailyLedgerRowDB) -> Self {
        let settle_status = SettleStatus::from_str(&db.settle_status).unwrap_or_else(|e| {
            log::error!(
                "daily_ledger.settle_status: {}. Falling back to {}.",
                e,
                SETTLE_STATUS_ESTIMATED_ONLY
            );
            SettleStatus::EstimatedOnly
        });
        Self {
            account_id: db.account_id,
            ledger_date: parse_date_tolerant(&db.ledger_date, "daily_ledger.ledger_date"),
            instrument_code: db.instrument_code,
            shares_end: parse_decimal_tolerant(&db.shares_end, "daily_ledger.shares_end"),
            avg_cost_end: parse_decimal_tolerant(&db.avg_cost_end, "daily_ledger.avg_cost_end"),
            realized_gain_end: parse_decimal_tolerant(
                &db.realized_gain_end,
                "daily_ledger.realized_gain_end",
            ),
            estimated_close_price: parse_decimal_tolerant(
                &db.estimated_close_price,
                "daily_ledger.estimated_close_price",
            ),
            estimated_close_gain: parse_decimal_tolerant(
                &db.estimated_close_gain,
                "daily_ledger.estimated_close_gain",
            ),
            official_close_price: parse_decimal_opt(
                db.official_close_price.as_deref(),
                "daily_ledger.official_close_price",
            ),
            official_close_gain: parse_decimal_opt(
                db.official_close_gain.as_deref(),
                "daily_ledger.official_close_gain",
            ),
            settle_status,
            updated_at: parse_timestamp_tolerant(&db.updated_at, "daily_ledger.updated_at"),
        }
    }
}

impl From<DailyLedgerRow> for DailyLedgerRowDB {
    fn from(domain: DailyLedgerRow) -> Self {
        Self {
            account_id: domain.account_id,
            ledger_date: format_date(domain.ledger_date),
            instrument_code: domain.instrument_code,
            shares_end: domain.shares_end.to_string(),
            avg_cost_end: domain.avg_cost_end.to_string(),
            realized_gain_end: domain.realized_gain_end.to_string(),
            estimated_close_price: domain.estimated_close_price.to_string(),
            estimated_close_gain: domain.estimated_close_gain.to_string(),
            official_close_price: domain.official_close_price.map(|d| d.to_string()),
            official_close_gain: domain.official_close_gain.map(|d| d.to_string()),
            settle_status: domain.settle_status.as_str().to_string(),
            updated_at: format_timestamp(domain.updated_at),
        }
    }
}

/// One settled (date, instrument) compared against its estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapRow {
    pub ledger_date: NaiveDate,
    pub estimated_close_price: Decimal,
    pub official_close_price: Decimal,
    /// official - estimated
    pub gap: Decimal,
    /// (official / estimated - 1) * 100
    pub gap_pct: Decimal,
    pub abs_gap_pct: Decimal,
}

/// Accuracy statistics for one instrument over a trailing window. All the
/// aggregate fields are `None` when no settled rows fell in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracySummary {
    pub count: usize,
    pub mean_abs_gap_pct: Option<Decimal>,
    pub max_abs_gap_pct: Option<Decimal>,
    pub hit_rate_pct: Option<Decimal>,
    pub threshold_pct: Decimal,
    pub latest: Option<GapRow>,
}

/// One fully settled date compared at portfolio level, weighting every
/// instrument by its end-of-day share count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioGapRow {
    pub ledger_date: NaiveDate,
    pub estimated_value: Decimal,
    pub official_value: Decimal,
    pub gap: Decimal,
    pub gap_pct: Decimal,
    pub abs_gap_pct: Decimal,
}

/// Portfolio-level accuracy statistics over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAccuracySummary {
    pub count: usize,
    pub mean_abs_gap_pct: Option<Decimal>,
    pub max_abs_gap_pct: Option<Decimal>,
    pub hit_rate_pct: Option<Decimal>,
    pub threshold_pct: Decimal,
    pub latest: Option<PortfolioGapRow>,
}
