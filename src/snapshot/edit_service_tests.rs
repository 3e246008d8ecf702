use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use crate::db::StoreHandle;
use crate::errors::{Error, Result, ValidationError};
use crate::journal::{
    AdjustmentEntry, JournalRepository, JournalRepositoryTrait, NewAdjustment,
    PROVENANCE_SYSTEM_EDIT,
};
use crate::snapshot::edit_service::EditService;
use crate::snapshot::snapshot_model::PositionEdit;
use crate::snapshot::snapshot_service::SnapshotService;
use crate::snapshot::snapshot_traits::{EditServiceTrait, SnapshotServiceTrait};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn edit(code: &str, on: &str, shares: Decimal, avg_cost: Decimal, gain: Decimal) -> PositionEdit {
    PositionEdit {
        instrument_code: code.to_string(),
        effective_date: date(on),
        target_shares: shares,
        target_avg_cost: avg_cost,
        target_realized_gain: gain,
        note: None,
    }
}

/// Journal repository that starts failing appends after a set number of
/// successes, for exercising mid-sequence rollback.
struct FlakyJournalRepository {
    inner: Arc<JournalRepository>,
    appends_before_failure: AtomicUsize,
}

impl FlakyJournalRepository {
    fn new(inner: Arc<JournalRepository>, appends_before_failure: usize) -> Self {
        Self {
            inner,
            appends_before_failure: AtomicUsize::new(appends_before_failure),
        }
    }
}

#[async_trait]
impl JournalRepositoryTrait for FlakyJournalRepository {
    fn get_entry(&self, entry_id: &str) -> Result<AdjustmentEntry> {
        self.inner.get_entry(entry_id)
    }

    fn list_entries(&self) -> Result<Vec<AdjustmentEntry>> {
        self.inner.list_entries()
    }

    fn list_entries_for_instrument(&self, instrument_code: &str) -> Result<Vec<AdjustmentEntry>> {
        self.inner.list_entries_for_instrument(instrument_code)
    }

    fn list_entries_through(&self, cutoff: NaiveDate) -> Result<Vec<AdjustmentEntry>> {
        self.inner.list_entries_through(cutoff)
    }

    async fn append(&self, new_entry: NewAdjustment) -> Result<AdjustmentEntry> {
        if self.appends_before_failure.fetch_sub(1, Ordering::SeqCst) == 0 {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "injected append failure".to_string(),
            )));
        }
        self.inner.append(new_entry).await
    }

    async fn remove(&self, entry_id: &str) -> Result<usize> {
        self.inner.remove(entry_id).await
    }

    async fn remove_by_instrument_and_date(
        &self,
        instrument_code: &str,
        effective_date: NaiveDate,
        provenance: Option<&str>,
    ) -> Result<Vec<AdjustmentEntry>> {
        self.inner
            .remove_by_instrument_and_date(instrument_code, effective_date, provenance)
            .await
    }

    async fn remove_by_instrument(&self, instrument_code: &str) -> Result<usize> {
        self.inner.remove_by_instrument(instrument_code).await
    }

    async fn clear(&self) -> Result<usize> {
        self.inner.clear().await
    }

    async fn restore(&self, entries: Vec<AdjustmentEntry>) -> Result<usize> {
        self.inner.restore(entries).await
    }
}

fn setup() -> (TempDir, Arc<JournalRepository>, EditService) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let store =
        StoreHandle::open(dir.path().to_str().unwrap(), "test-account").expect("failed to open store");
    let repository = Arc::new(JournalRepository::new(
        store.pool(),
        store.writer(),
        store.account_id(),
    ));
    let snapshot_service = Arc::new(SnapshotService::new(repository.clone()));
    let edit_service = EditService::new(repository.clone(), snapshot_service);
    (dir, repository, edit_service)
}

#[tokio::test]
async fn test_edit_from_scratch_hits_target_exactly() {
    let (_dir, repository, edit_service) = setup();

    let outcome = edit_service
        .apply_edit(edit("510300", "2026-01-30", dec!(1000), dec!(4.50), dec!(5.0)))
        .await
        .unwrap();

    assert_eq!(outcome.removed_entries, 0);
    assert_eq!(outcome.appended_entries.len(), 2);
    assert!(outcome
        .appended_entries
        .iter()
        .all(|e| e.provenance == PROVENANCE_SYSTEM_EDIT));

    let position = outcome.position.expect("position missing after edit");
    assert_eq!(position.shares_end, dec!(1000));
    assert_eq!(position.avg_cost_end, dec!(4.50));
    assert_eq!(position.realized_gain_end, dec!(5.0));

    assert_eq!(repository.list_entries().unwrap().len(), 2);
}

#[tokio::test]
async fn test_edit_is_idempotent() {
    let (_dir, repository, edit_service) = setup();

    let target = edit("510300", "2026-01-30", dec!(1000), dec!(4.50), dec!(5.0));
    let first = edit_service.apply_edit(target.clone()).await.unwrap();
    let second = edit_service.apply_edit(target).await.unwrap();

    assert_eq!(first.position, second.position);
    // Re-applying replaces the previous delta rather than stacking on it.
    assert_eq!(second.removed_entries, 2);
    assert_eq!(repository.list_entries().unwrap().len(), 2);
}

#[tokio::test]
async fn test_edit_never_touches_manual_entries() {
    let (_dir, repository, edit_service) = setup();

    let manual = NewAdjustment::buy("510300", date("2026-01-30"), dec!(500), dec!(4.00));
    repository.append(manual).await.unwrap();

    edit_service
        .apply_edit(edit("510300", "2026-01-30", dec!(1000), dec!(4.50), dec!(0)))
        .await
        .unwrap();
    let outcome = edit_service
        .apply_edit(edit("510300", "2026-01-30", dec!(800), dec!(4.50), dec!(0)))
        .await
        .unwrap();

    let entries = repository.list_entries().unwrap();
    assert!(entries.iter().any(|e| e.provenance == "manual" && e.shares == dec!(500)));
    assert_eq!(outcome.position.unwrap().shares_end, dec!(800));
}

#[tokio::test]
async fn test_failed_edit_rolls_back_to_prior_state() {
    let (_dir, repository, edit_service) = setup();

    edit_service
        .apply_edit(edit("510300", "2026-01-30", dec!(1000), dec!(4.50), dec!(5.0)))
        .await
        .unwrap();
    let before: Vec<AdjustmentEntry> = repository.list_entries().unwrap();
    assert_eq!(before.len(), 2);

    // Second edit: the share-delta append succeeds, the cash append fails.
    let flaky = Arc::new(FlakyJournalRepository::new(repository.clone(), 1));
    let snapshot_service = Arc::new(SnapshotService::new(flaky.clone()));
    let flaky_edit_service = EditService::new(flaky, snapshot_service);

    let err = flaky_edit_service
        .apply_edit(edit("510300", "2026-01-30", dec!(400), dec!(4.00), dec!(9.0)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Journal is back to exactly the pre-edit rows, ids included.
    let after = repository.list_entries().unwrap();
    let mut before_ids: Vec<&str> = before.iter().map(|e| e.id.as_str()).collect();
    let mut after_ids: Vec<&str> = after.iter().map(|e| e.id.as_str()).collect();
    before_ids.sort();
    after_ids.sort();
    assert_eq!(before_ids, after_ids);

    let snapshot_service = Arc::new(SnapshotService::new(repository.clone()));
    let position = snapshot_service
        .positions_as_of(date("2026-01-30"))
        .unwrap()
        .position("510300")
        .cloned()
        .unwrap();
    assert_eq!(position.shares_end, dec!(1000));
    assert_eq!(position.realized_gain_end, dec!(5.0));
}

#[tokio::test]
async fn test_edit_to_flat_position() {
    let (_dir, repository, edit_service) = setup();

    repository
        .append(NewAdjustment::buy("159915", date("2026-02-02"), dec!(100), dec!(10)))
        .await
        .unwrap();

    let outcome = edit_service
        .apply_edit(edit("159915", "2026-02-02", dec!(0), dec!(0), dec!(0)))
        .await
        .unwrap();

    // Flat with nothing realized: the snapshot drops the instrument.
    assert!(outcome.position.is_none());
    let entries = repository.list_entries().unwrap();
    assert_eq!(entries.iter().filter(|e| e.provenance == PROVENANCE_SYSTEM_EDIT).count(), 2);
}

#[tokio::test]
async fn test_edit_rejects_negative_target() {
    let (_dir, _repository, edit_service) = setup();

    let err = edit_service
        .apply_edit(edit("510300", "2026-01-30", dec!(-10), dec!(4.50), dec!(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::InvalidInput(_))));
}
