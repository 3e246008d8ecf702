//! Conversion helpers shared by the database model boundaries.
//!
//! Amounts and dates are persisted as TEXT; parsing back is tolerant (log and
//! fall back) so one bad row never poisons a whole load.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a string into a Decimal, with a fallback for scientific notation by
/// parsing as f64 first.
pub fn parse_decimal_tolerant(value_str: &str, field_name: &str) -> Decimal {
    match Decimal::from_str(value_str) {
        Ok(d) => d,
        Err(e_decimal) => match f64::from_str(value_str) {
            Ok(f_val) => match Decimal::from_f64(f_val) {
                Some(dec_val) => dec_val,
                None => {
                    log::error!(
                        "Failed to convert {} '{}' (parsed as f64: {}) to Decimal.",
                        field_name,
                        value_str,
                        f_val
                    );
                    Decimal::ZERO
                }
            },
            Err(e_f64) => {
                log::error!(
                    "Failed to parse {} '{}': as Decimal (err: {}), and as f64 (err: {}). Falling back to ZERO.",
                    field_name,
                    value_str,
                    e_decimal,
                    e_f64
                );
                Decimal::ZERO
            }
        },
    }
}

pub fn parse_decimal_opt(value: Option<&str>, field_name: &str) -> Option<Decimal> {
    value.map(|v| parse_decimal_tolerant(v, field_name))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_tolerant(value_str: &str, field_name: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value_str, "%Y-%m-%d").unwrap_or_else(|e| {
        log::error!(
            "Failed to parse {} '{}' as date: {}. Falling back to epoch.",
            field_name,
            value_str,
            e
        );
        NaiveDate::default()
    })
}

/// Fixed-width UTC timestamp; lexicographic order equals chronological order,
/// which the journal's (effective_date, created_at) replay ordering relies on.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp_tolerant(value_str: &str, field_name: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::error!(
                "Failed to parse {} '{}' as timestamp: {}. Falling back to epoch.",
                field_name,
                value_str,
                e
            );
            DateTime::<Utc>::default()
        })
}
