use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::PORTFOLIO_TARGET;
use crate::intraday::intraday_constants::MARKER_CLOSE;
use crate::portfolio::PortfolioTotals;
use crate::utils::{
    format_date, format_timestamp, parse_date_tolerant, parse_decimal_opt, parse_timestamp_tolerant,
};
use crate::valuation::EstimateResult;

/// One stored intraday sample. Instrument points carry the estimate fields,
/// portfolio points the aggregate fields; a close sample additionally carries
/// `marker = CLOSE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntradayPoint {
    pub id: i32,
    pub account_id: String,
    pub sample_date: NaiveDate,
    pub target: String,
    pub point_time: DateTime<Utc>,
    pub marker: Option<String>,
    pub estimated_price: Option<Decimal>,
    pub estimated_change_pct: Option<Decimal>,
    pub method: Option<String>,
    pub confidence: Option<f64>,
    pub warning: Option<String>,
    pub display_name: Option<String>,
    pub as_of_time: Option<DateTime<Utc>>,
    pub total_value: Option<Decimal>,
    pub total_gain: Option<Decimal>,
    pub total_gain_pct: Option<Decimal>,
    pub coverage_value_pct: Option<Decimal>,
}

impl IntradayPoint {
    pub fn is_close_marker(&self) -> bool {
        self.marker.as_deref() == Some(MARKER_CLOSE)
    }
}

/// A sample about to be appended. The row id is assigned by the database and
/// the account scope is stamped by the repository on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIntradayPoint {
    pub sample_date: NaiveDate,
    pub target: String,
    pub point_time: DateTime<Utc>,
    pub marker: Option<String>,
    pub estimated_price: Option<Decimal>,
    pub estimated_change_pct: Option<Decimal>,
    pub method: Option<String>,
    pub confidence: Option<f64>,
    pub warning: Option<String>,
    pub display_name: Option<String>,
    pub as_of_time: Option<DateTime<Utc>>,
    pub total_value: Option<Decimal>,
    pub total_gain: Option<Decimal>,
    pub total_gain_pct: Option<Decimal>,
    pub coverage_value_pct: Option<Decimal>,
}

impl NewIntradayPoint {
    /// Sample for one instrument, taken from a router estimate.
    pub fn from_estimate(sample_date: NaiveDate, estimate: &EstimateResult) -> Self {
        Self {
            sample_date,
            target: estimate.instrument_code.clone(),
            point_time: Utc::now(),
            marker: None,
            estimated_price: Some(estimate.estimated_price),
            estimated_change_pct: Some(estimate.estimated_change_pct),
            method: Some(estimate.method.clone()),
            confidence: Some(estimate.confidence),
            warning: estimate.warning.clone(),
            display_name: Some(estimate.display_name.clone()),
            as_of_time: Some(estimate.as_of_time),
            total_value: None,
            total_gain: None,
            total_gain_pct: None,
            coverage_value_pct: None,
        }
    }

    /// Sample for the synthetic portfolio target, taken from view totals.
    pub fn from_portfolio(sample_date: NaiveDate, totals: &PortfolioTotals) -> Self {
        Self {
            sample_date,
            target: PORTFOLIO_TARGET.to_string(),
            point_time: Utc::now(),
            marker: None,
            estimated_price: None,
            estimated_change_pct: None,
            method: None,
            confidence: None,
            warning: None,
            display_name: None,
            as_of_time: None,
            total_value: Some(totals.total_value),
            total_gain: Some(totals.total_gain),
            total_gain_pct: Some(totals.total_gain_pct),
            coverage_value_pct: Some(totals.coverage_value_pct),
        }
    }

    /// Payload-free sample. Used for close markers on targets that have no
    /// live estimate at close time.
    pub fn bare(sample_date: NaiveDate, target: &str) -> Self {
        Self {
            sample_date,
            target: target.to_string(),
            point_time: Utc::now(),
            marker: None,
            estimated_price: None,
            estimated_change_pct: None,
            method: None,
            confidence: None,
            warning: None,
            display_name: None,
            as_of_time: None,
            total_value: None,
            total_gain: None,
            total_gain_pct: None,
            coverage_value_pct: None,
        }
    }

    pub fn with_marker(mut self, marker: &str) -> Self {
        self.marker = Some(marker.to_string());
        self
    }

    pub(crate) fn into_db(self, account_id: &str) -> NewIntradayPointDB {
        NewIntradayPointDB {
            account_id: account_id.to_string(),
            sample_date: format_date(self.sample_date),
            target: self.target,
            point_time: format_timestamp(self.point_time),
            marker: self.marker,
            estimated_price: self.estimated_price.map(|d| d.to_string()),
            estimated_change_pct: self.estimated_change_pct.map(|d| d.to_string()),
            method: self.method,
            confidence: self.confidence,
            warning: self.warning,
            display_name: self.display_name,
            as_of_time: self.as_of_time.map(format_timestamp),
            total_value: self.total_value.map(|d| d.to_string()),
            total_gain: self.total_gain.map(|d| d.to_string()),
            total_gain_pct: self.total_gain_pct.map(|d| d.to_string()),
            coverage_value_pct: self.coverage_value_pct.map(|d| d.to_string()),
        }
    }
}

/// Database model for stored intraday points.
#[derive(Queryable, Selectable, Identifiable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::intraday_points)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IntradayPointDB {
    pub id: i32,
    pub account_id: String,
    pub sample_date: String,
    pub target: String,
    pub point_time: String,
    pub marker: Option<String>,
    pub estimated_price: Option<String>,
    pub estimated_change_pct: Option<String>,
    pub method: Option<String>,
    pub confidence: Option<f64>,
    pub warning: Option<String>,
    pub display_name: Option<String>,
    pub as_of_time: Option<String>,
    pub total_value: Option<String>,
    pub total_gain: Option<String>,
    pub total_gain_pct: Option<String>,
    pub coverage_value_pct: Option<String>,
}

/// Insert model; the id column is left to sqlite's rowid allocation.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::intraday_points)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NewIntradayPointDB {
    pub account_id: String,
    pub sample_date: String,
    pub target: String,
    pub point_time: String,
    pub marker: Option<String>,
    pub estimated_price: Option<String>,
    pub estimated_change_pct: Option<String>,
    pub method: Option<String>,
    pub confidence: Option<f64>,
    pub warning: Option<String>,
    pub display_name: Option<String>,
    pub as_of_time: Option<String>,
    pub total_value: Option<String>,
    pub total_gain: Option<String>,
    pub total_gain_pct: Option<String>,
    pub coverage_value_pct: Option<String>,
}

impl From<IntradayPointDB> for IntradayPoint {
    fn from(db: IntradayPointDB) -> Self {
        Self {
            id: db.id,
            account_id: db.account_id,
            sample_date: parse_date_tolerant(&db.sample_date, "intraday_points.sample_date"),
            target: db.target,
            point_time: parse_timestamp_tolerant(&db.point_time, "intraday_points.point_time"),
            marker: db.marker,
            estimated_price: parse_decimal_opt(
                db.estimated_price.as_deref(),
                "intraday_points.estimated_price",
            ),
            estimated_change_pct: parse_decimal_opt(
                db.estimated_change_pct.as_deref(),
                "intraday_points.estimated_change_pct",
            ),
            method: db.method,
            confidence: db.confidence,
            warning: db.warning,
            display_name: db.display_name,
            as_of_time: db
                .as_of_time
                .as_deref()
                .map(|v| parse_timestamp_tolerant(v, "intraday_points.as_of_time")),
            total_value: parse_decimal_opt(
                db.total_value.as_deref(),
                "intraday_points.total_value",
            ),
            total_gain: parse_decimal_opt(db.total_gain.as_deref(), "intraday_points.total_gain"),
            total_gain_pct: parse_decimal_opt(
                db.total_gain_pct.as_deref(),
                "intraday_points.total_gain_pct",
            ),
            coverage_value_pct: parse_decimal_opt(
                db.coverage_value_pct.as_deref(),
                "intraday_points.coverage_value_pct",
            ),
        }
    }
}
