use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::ValidationError;
use crate::journal::AdjustmentEntry;

/// Position state for one instrument as of a date. Derived by replaying the
/// journal; never persisted, so it cannot go stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub instrument_code: String,
    pub shares_end: Decimal,
    pub avg_cost_end: Decimal,
    pub realized_gain_end: Decimal,
}

impl PositionSnapshot {
    pub fn new(instrument_code: &str) -> Self {
        Self {
            instrument_code: instrument_code.to_string(),
            shares_end: Decimal::ZERO,
            avg_cost_end: Decimal::ZERO,
            realized_gain_end: Decimal::ZERO,
        }
    }

    /// Cost basis of the open position.
    pub fn cost_basis(&self) -> Decimal {
        self.shares_end * self.avg_cost_end
    }
}

/// Advisory warnings collected while replaying the journal. Replay never
/// aborts on these; callers decide whether to surface them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReplayWarning {
    /// A SELL asked for more shares than were held; the sell was clamped.
    OverSell {
        entry_id: String,
        instrument_code: String,
        requested: Decimal,
        available: Decimal,
    },
    /// An entry carried values replay cannot apply (non-positive shares/price).
    InvalidEntry {
        entry_id: String,
        instrument_code: String,
        reason: String,
    },
    /// An entry kind this engine does not understand; entry skipped.
    UnknownKind { entry_id: String, kind: String },
}

impl fmt::Display for ReplayWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayWarning::OverSell {
                entry_id,
                instrument_code,
                requested,
                available,
            } => write!(
                f,
                "Entry {} sells {} shares of {} but only {} held; sell clamped",
                entry_id, requested, instrument_code, available
            ),
            ReplayWarning::InvalidEntry {
                entry_id,
                instrument_code,
                reason,
            } => write!(
                f,
                "Entry {} for {} skipped: {}",
                entry_id, instrument_code, reason
            ),
            ReplayWarning::UnknownKind { entry_id, kind } => {
                write!(f, "Entry {} has unknown kind '{}'; skipped", entry_id, kind)
            }
        }
    }
}

/// Full replay output: positions keyed by instrument code plus the warnings
/// gathered along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    pub as_of: NaiveDate,
    pub positions: HashMap<String, PositionSnapshot>,
    pub warnings: Vec<ReplayWarning>,
}

impl SnapshotResult {
    pub fn position(&self, instrument_code: &str) -> Option<&PositionSnapshot> {
        self.positions.get(instrument_code)
    }

    /// Instrument codes present in this snapshot, sorted for stable output.
    pub fn instrument_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.positions.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A user's desired end-of-day position, applied through the edit bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEdit {
    pub instrument_code: String,
    pub effective_date: NaiveDate,
    pub target_shares: Decimal,
    pub target_avg_cost: Decimal,
    #[serde(default)]
    pub target_realized_gain: Decimal,
    pub note: Option<String>,
}

impl PositionEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.instrument_code.trim().is_empty() {
            return Err(ValidationError::MissingField("instrument_code".to_string()));
        }
        if self.target_shares < Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "target_shares must be >= 0, got {}",
                self.target_shares
            )));
        }
        if self.target_avg_cost < Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "target_avg_cost must be >= 0, got {}",
                self.target_avg_cost
            )));
        }
        Ok(())
    }
}

/// What an edit actually did to the journal, returned for display and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub instrument_code: String,
    pub effective_date: NaiveDate,
    pub removed_entries: usize,
    pub appended_entries: Vec<AdjustmentEntry>,
    pub position: Option<PositionSnapshot>,
}
