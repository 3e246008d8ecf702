use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::journal::journal_constants::*;
use crate::journal::journal_errors::JournalError;
use crate::utils::{
    format_date, format_timestamp, parse_date_tolerant, parse_decimal_tolerant,
    parse_timestamp_tolerant,
};

/// Domain model for one adjustment-journal fact. Immutable once appended;
/// revisions supersede (delete and re-append), they never mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentEntry {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub instrument_code: String,
    pub effective_date: NaiveDate,
    pub shares: Decimal,
    pub price: Decimal,
    pub cash: Decimal,
    pub note: Option<String>,
    pub provenance: String,
    pub created_at: DateTime<Utc>,
}

/// Database model for adjustment entries. Amounts and dates are TEXT;
/// conversion happens at this boundary only.
#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::adjustments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct AdjustmentEntryDB {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub instrument_code: String,
    pub effective_date: String,
    pub shares: String,
    pub price: String,
    pub cash: String,
    pub note: Option<String>,
    pub provenance: String,
    pub created_at: String,
}

/// Input model for appending a new adjustment entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdjustment {
    pub kind: String,
    pub instrument_code: String,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub shares: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub cash: Decimal,
    pub note: Option<String>,
    pub provenance: String,
}

impl NewAdjustment {
    pub fn buy(instrument_code: &str, effective_date: NaiveDate, shares: Decimal, price: Decimal) -> Self {
        Self {
            kind: KIND_BUY.to_string(),
            instrument_code: instrument_code.to_string(),
            effective_date,
            shares,
            price,
            cash: Decimal::ZERO,
            note: None,
            provenance: PROVENANCE_MANUAL.to_string(),
        }
    }

    pub fn sell(instrument_code: &str, effective_date: NaiveDate, shares: Decimal, price: Decimal) -> Self {
        Self {
            kind: KIND_SELL.to_string(),
            instrument_code: instrument_code.to_string(),
            effective_date,
            shares,
            price,
            cash: Decimal::ZERO,
            note: None,
            provenance: PROVENANCE_MANUAL.to_string(),
        }
    }

    pub fn cash_adjustment(instrument_code: &str, effective_date: NaiveDate, cash: Decimal) -> Self {
        Self {
            kind: KIND_CASH_ADJUSTMENT.to_string(),
            instrument_code: instrument_code.to_string(),
            effective_date,
            shares: Decimal::ZERO,
            price: Decimal::ZERO,
            cash,
            note: None,
            provenance: PROVENANCE_MANUAL.to_string(),
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn with_provenance(mut self, provenance: &str) -> Self {
        self.provenance = provenance.to_string();
        self
    }

    /// Validates kind-specific numeric constraints before anything is
    /// written. BUY/SELL need positive shares and price; every entry needs a
    /// known kind, a non-empty instrument code and a known provenance tag.
    pub fn validate(&self) -> Result<(), JournalError> {
        if self.instrument_code.trim().is_empty() {
            return Err(JournalError::InvalidData(
                "Instrument code cannot be empty".to_string(),
            ));
        }

        let kind = AdjustmentKind::from_str(&self.kind)
            .map_err(|_| JournalError::InvalidData(format!("Unknown adjustment kind: {}", self.kind)))?;

        if matches!(kind, AdjustmentKind::Buy | AdjustmentKind::Sell) {
            if self.shares <= Decimal::ZERO {
                return Err(JournalError::InvalidData(format!(
                    "{} requires shares > 0, got {}",
                    self.kind, self.shares
                )));
            }
            if self.price <= Decimal::ZERO {
                return Err(JournalError::InvalidData(format!(
                    "{} requires price > 0, got {}",
                    self.kind, self.price
                )));
            }
        }

        if self.provenance != PROVENANCE_MANUAL && self.provenance != PROVENANCE_SYSTEM_EDIT {
            return Err(JournalError::InvalidData(format!(
                "Unknown provenance tag: {}",
                self.provenance
            )));
        }

        Ok(())
    }

    /// Builds the database row for this input, stamping id and created_at.
    pub(crate) fn into_db(self, account_id: &str, id: String, created_at: DateTime<Utc>) -> AdjustmentEntryDB {
        AdjustmentEntryDB {
            id,
            account_id: account_id.to_string(),
            kind: self.kind,
            instrument_code: self.instrument_code.trim().to_string(),
            effective_date: format_date(self.effective_date),
            shares: self.shares.to_string(),
            price: self.price.to_string(),
            cash: self.cash.to_string(),
            note: self.note,
            provenance: self.provenance,
            created_at: format_timestamp(created_at),
        }
    }
}

/// Enum over the journal's entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustmentKind {
    Buy,
    Sell,
    CashAdjustment,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Buy => KIND_BUY,
            AdjustmentKind::Sell => KIND_SELL,
            AdjustmentKind::CashAdjustment => KIND_CASH_ADJUSTMENT,
        }
    }
}

impl FromStr for AdjustmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s == KIND_BUY => Ok(AdjustmentKind::Buy),
            s if s == KIND_SELL => Ok(AdjustmentKind::Sell),
            s if s == KIND_CASH_ADJUSTMENT => Ok(AdjustmentKind::CashAdjustment),
            _ => Err(format!("Unknown adjustment kind: {}", s)),
        }
    }
}

// Conversion implementations
impl From<AdjustmentEntryDB> for AdjustmentEntry {
    fn from(db: AdjustmentEntryDB) -> Self {
        Self {
            id: db.id,
            account_id: db.account_id,
            kind: db.kind,
            instrument_code: db.instrument_code,
            effective_date: parse_date_tolerant(&db.effective_date, "adjustments.effective_date"),
            shares: parse_decimal_tolerant(&db.shares, "adjustments.shares"),
            price: parse_decimal_tolerant(&db.price, "adjustments.price"),
            cash: parse_decimal_tolerant(&db.cash, "adjustments.cash"),
            note: db.note,
            provenance: db.provenance,
            created_at: parse_timestamp_tolerant(&db.created_at, "adjustments.created_at"),
        }
    }
}

impl From<AdjustmentEntry> for AdjustmentEntryDB {
    fn from(domain: AdjustmentEntry) -> Self {
        Self {
            id: domain.id,
            account_id: domain.account_id,
            kind: domain.kind,
            instrument_code: domain.instrument_code,
            effective_date: format_date(domain.effective_date),
            shares: domain.shares.to_string(),
            price: domain.price.to_string(),
            cash: domain.cash.to_string(),
            note: domain.note,
            provenance: domain.provenance,
            created_at: format_timestamp(domain.created_at),
        }
    }
}
