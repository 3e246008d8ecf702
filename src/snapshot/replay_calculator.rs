use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::constants::{DECIMAL_PRECISION, GAIN_EPSILON, QUANTITY_EPSILON};
use crate::journal::{AdjustmentEntry, AdjustmentKind};
use crate::snapshot::snapshot_model::{PositionSnapshot, ReplayWarning, SnapshotResult};
use crate::utils::parse_decimal_tolerant;

/// Folds ordered journal entries into per-instrument position state.
///
/// This is a pure function of the entry list and the as-of date: no clock, no
/// storage, no quotes. Bad entries degrade to warnings; the fold always runs
/// to completion so one stale row can never block the whole portfolio.
#[derive(Clone)]
pub struct ReplayCalculator {
    quantity_epsilon: Decimal,
    gain_epsilon: Decimal,
}

impl Default for ReplayCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayCalculator {
    pub fn new() -> Self {
        Self {
            quantity_epsilon: parse_decimal_tolerant(QUANTITY_EPSILON, "quantity epsilon"),
            gain_epsilon: parse_decimal_tolerant(GAIN_EPSILON, "gain epsilon"),
        }
    }

    /// Replays every entry with `effective_date <= as_of` in the order given.
    /// Callers pass entries already sorted by (effective_date, created_at).
    pub fn replay(&self, entries: &[AdjustmentEntry], as_of: NaiveDate) -> SnapshotResult {
        let mut positions: HashMap<String, PositionSnapshot> = HashMap::new();
        let mut warnings: Vec<ReplayWarning> = Vec::new();

        for entry in entries {
            if entry.effective_date > as_of {
                continue;
            }

            match AdjustmentKind::from_str(&entry.kind) {
                Ok(AdjustmentKind::Buy) => self.apply_buy(entry, &mut positions, &mut warnings),
                Ok(AdjustmentKind::Sell) => self.apply_sell(entry, &mut positions, &mut warnings),
                Ok(AdjustmentKind::CashAdjustment) => {
                    let position = positions
                        .entry(entry.instrument_code.clone())
                        .or_insert_with(|| PositionSnapshot::new(&entry.instrument_code));
                    position.realized_gain_end += entry.cash;
                }
                Err(_) => {
                    debug!("Skipping entry {} with unknown kind {}", entry.id, entry.kind);
                    warnings.push(ReplayWarning::UnknownKind {
                        entry_id: entry.id.clone(),
                        kind: entry.kind.clone(),
                    });
                }
            }
        }

        // Closed-out instruments with nothing realized carry no information.
        positions.retain(|_, p| {
            p.shares_end > self.quantity_epsilon || p.realized_gain_end.abs() > self.gain_epsilon
        });

        SnapshotResult {
            as_of,
            positions,
            warnings,
        }
    }

    fn apply_buy(
        &self,
        entry: &AdjustmentEntry,
        positions: &mut HashMap<String, PositionSnapshot>,
        warnings: &mut Vec<ReplayWarning>,
    ) {
        if entry.shares <= Decimal::ZERO || entry.price <= Decimal::ZERO {
            warnings.push(ReplayWarning::InvalidEntry {
                entry_id: entry.id.clone(),
                instrument_code: entry.instrument_code.clone(),
                reason: format!(
                    "BUY requires positive shares and price, got {} @ {}",
                    entry.shares, entry.price
                ),
            });
            return;
        }

        let position = positions
            .entry(entry.instrument_code.clone())
            .or_insert_with(|| PositionSnapshot::new(&entry.instrument_code));

        let new_shares = position.shares_end + entry.shares;
        let total_cost = position.shares_end * position.avg_cost_end + entry.shares * entry.price;
        position.avg_cost_end = (total_cost / new_shares).round_dp(DECIMAL_PRECISION);
        position.shares_end = new_shares;
    }

    fn apply_sell(
        &self,
        entry: &AdjustmentEntry,
        positions: &mut HashMap<String, PositionSnapshot>,
        warnings: &mut Vec<ReplayWarning>,
    ) {
        if entry.shares <= Decimal::ZERO || entry.price <= Decimal::ZERO {
            warnings.push(ReplayWarning::InvalidEntry {
                entry_id: entry.id.clone(),
                instrument_code: entry.instrument_code.clone(),
                reason: format!(
                    "SELL requires positive shares and price, got {} @ {}",
                    entry.shares, entry.price
                ),
            });
            return;
        }

        let position = positions
            .entry(entry.instrument_code.clone())
            .or_insert_with(|| PositionSnapshot::new(&entry.instrument_code));

        // Over-sell clamps instead of failing: the journal may hold stale or
        // duplicated rows and replay must still produce a usable snapshot.
        let mut sold = entry.shares;
        if sold > position.shares_end + self.quantity_epsilon {
            warnings.push(ReplayWarning::OverSell {
                entry_id: entry.id.clone(),
                instrument_code: entry.instrument_code.clone(),
                requested: sold,
                available: position.shares_end,
            });
            sold = position.shares_end;
        } else if sold > position.shares_end {
            sold = position.shares_end;
        }

        position.realized_gain_end += ((entry.price - position.avg_cost_end) * sold)
            .round_dp(DECIMAL_PRECISION);
        position.shares_end -= sold;

        if position.shares_end <= self.quantity_epsilon {
            position.shares_end = Decimal::ZERO;
            position.avg_cost_end = Decimal::ZERO;
        }
    }
}
