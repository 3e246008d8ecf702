use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

use crate::errors::Result;
use crate::journal::journal_model::{AdjustmentEntry, NewAdjustment};
use crate::journal::journal_traits::{JournalRepositoryTrait, JournalServiceTrait};

/// Service facade over the adjustment journal.
pub struct JournalService {
    journal_repository: Arc<dyn JournalRepositoryTrait>,
}

impl JournalService {
    pub fn new(journal_repository: Arc<dyn JournalRepositoryTrait>) -> Self {
        Self { journal_repository }
    }
}

#[async_trait]
impl JournalServiceTrait for JournalService {
    fn get_entry(&self, entry_id: &str) -> Result<AdjustmentEntry> {
        self.journal_repository.get_entry(entry_id)
    }

    fn list_entries(&self) -> Result<Vec<AdjustmentEntry>> {
        self.journal_repository.list_entries()
    }

    fn list_entries_for_instrument(&self, instrument_code: &str) -> Result<Vec<AdjustmentEntry>> {
        self.journal_repository
            .list_entries_for_instrument(instrument_code)
    }

    async fn append(&self, new_entry: NewAdjustment) -> Result<AdjustmentEntry> {
        new_entry.validate()?;
        debug!(
            "Appending journal entry: {} {} on {}",
            new_entry.kind, new_entry.instrument_code, new_entry.effective_date
        );
        self.journal_repository.append(new_entry).await
    }

    async fn remove(&self, entry_id: &str) -> Result<usize> {
        self.journal_repository.remove(entry_id).await
    }

    async fn remove_for_date(
        &self,
        instrument_code: &str,
        effective_date: NaiveDate,
        provenance: Option<&str>,
    ) -> Result<Vec<AdjustmentEntry>> {
        self.journal_repository
            .remove_by_instrument_and_date(instrument_code, effective_date, provenance)
            .await
    }

    async fn remove_instrument(&self, instrument_code: &str) -> Result<usize> {
        debug!("Removing all journal entries for {}", instrument_code);
        self.journal_repository
            .remove_by_instrument(instrument_code)
            .await
    }

    async fn clear(&self) -> Result<usize> {
        self.journal_repository.clear().await
    }
}
