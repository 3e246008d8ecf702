use async_trait::async_trait;
use log::{error, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::constants::{GAIN_EPSILON, QUANTITY_EPSILON};
use crate::errors::Result;
use crate::journal::{
    AdjustmentEntry, JournalRepositoryTrait, NewAdjustment, PROVENANCE_SYSTEM_EDIT,
};
use crate::snapshot::snapshot_model::{EditOutcome, PositionEdit};
use crate::snapshot::snapshot_traits::{EditServiceTrait, SnapshotServiceTrait};
use crate::utils::parse_decimal_tolerant;

/// Translates a desired end-of-day position into a minimal journal delta.
///
/// Only entries tagged `system_edit` are ever replaced; manually entered
/// trades are never touched, so repeated edits to the same day stay
/// idempotent without rewriting real history.
pub struct EditService {
    journal_repository: Arc<dyn JournalRepositoryTrait>,
    snapshot_service: Arc<dyn SnapshotServiceTrait>,
    quantity_epsilon: Decimal,
    gain_epsilon: Decimal,
}

impl EditService {
    pub fn new(
        journal_repository: Arc<dyn JournalRepositoryTrait>,
        snapshot_service: Arc<dyn SnapshotServiceTrait>,
    ) -> Self {
        Self {
            journal_repository,
            snapshot_service,
            quantity_epsilon: parse_decimal_tolerant(QUANTITY_EPSILON, "quantity epsilon"),
            gain_epsilon: parse_decimal_tolerant(GAIN_EPSILON, "gain epsilon"),
        }
    }

    async fn emit_delta_entries(&self, edit: &PositionEdit) -> Result<Vec<AdjustmentEntry>> {
        let mut appended = Vec::new();

        let baseline = self.snapshot_service.positions_as_of(edit.effective_date)?;
        let baseline_shares = baseline
            .position(&edit.instrument_code)
            .map(|p| p.shares_end)
            .unwrap_or(Decimal::ZERO);

        let share_delta = edit.target_shares - baseline_shares;
        if share_delta.abs() > self.quantity_epsilon {
            // Price the delta at the target average cost so a from-scratch
            // edit lands exactly on it. Zero cost still needs a valid price.
            let price = if edit.target_avg_cost > Decimal::ZERO {
                edit.target_avg_cost
            } else {
                Decimal::ONE
            };

            let mut entry = if share_delta > Decimal::ZERO {
                NewAdjustment::buy(&edit.instrument_code, edit.effective_date, share_delta, price)
            } else {
                NewAdjustment::sell(&edit.instrument_code, edit.effective_date, -share_delta, price)
            }
            .with_provenance(PROVENANCE_SYSTEM_EDIT);
            if let Some(note) = &edit.note {
                entry = entry.with_note(note);
            }
            entry.validate()?;
            appended.push(self.journal_repository.append(entry).await?);
        }

        // A second replay shows where realized gain landed after the share
        // delta; the rest is settled with one cash adjustment.
        let interim = self.snapshot_service.positions_as_of(edit.effective_date)?;
        let interim_gain = interim
            .position(&edit.instrument_code)
            .map(|p| p.realized_gain_end)
            .unwrap_or(Decimal::ZERO);

        let gain_delta = edit.target_realized_gain - interim_gain;
        if gain_delta.abs() > self.gain_epsilon {
            let mut entry = NewAdjustment::cash_adjustment(
                &edit.instrument_code,
                edit.effective_date,
                gain_delta,
            )
            .with_provenance(PROVENANCE_SYSTEM_EDIT);
            if let Some(note) = &edit.note {
                entry = entry.with_note(note);
            }
            appended.push(self.journal_repository.append(entry).await?);
        }

        Ok(appended)
    }

    /// Best-effort rollback: drop whatever partial system-edit rows this
    /// attempt wrote, then put the previously removed ones back.
    async fn rollback(&self, edit: &PositionEdit, removed: Vec<AdjustmentEntry>) -> Result<()> {
        self.journal_repository
            .remove_by_instrument_and_date(
                &edit.instrument_code,
                edit.effective_date,
                Some(PROVENANCE_SYSTEM_EDIT),
            )
            .await?;
        self.journal_repository.restore(removed).await?;
        Ok(())
    }
}

#[async_trait]
impl EditServiceTrait for EditService {
    async fn apply_edit(&self, edit: PositionEdit) -> Result<EditOutcome> {
        edit.validate()?;

        // Replace, never accumulate: prior system-edit rows for this day are
        // withdrawn first and kept aside in case we have to roll back.
        let removed = self
            .journal_repository
            .remove_by_instrument_and_date(
                &edit.instrument_code,
                edit.effective_date,
                Some(PROVENANCE_SYSTEM_EDIT),
            )
            .await?;
        let removed_count = removed.len();

        match self.emit_delta_entries(&edit).await {
            Ok(appended) => {
                let result = self.snapshot_service.positions_as_of(edit.effective_date)?;
                let position = result.position(&edit.instrument_code).cloned();
                info!(
                    "Applied position edit for {} on {}: removed {}, appended {} entries",
                    edit.instrument_code,
                    edit.effective_date,
                    removed_count,
                    appended.len()
                );
                Ok(EditOutcome {
                    instrument_code: edit.instrument_code.clone(),
                    effective_date: edit.effective_date,
                    removed_entries: removed_count,
                    appended_entries: appended,
                    position,
                })
            }
            Err(e) => {
                warn!(
                    "Position edit for {} on {} failed, rolling back: {}",
                    edit.instrument_code, edit.effective_date, e
                );
                if let Err(rollback_err) = self.rollback(&edit, removed).await {
                    error!(
                        "Rollback after failed edit for {} on {} also failed: {}",
                        edit.instrument_code, edit.effective_date, rollback_err
                    );
                }
                Err(e)
            }
        }
    }
}
