use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::journal::journal_model::{AdjustmentEntry, NewAdjustment};

/// Trait for adjustment-journal repository operations
#[async_trait]
pub trait JournalRepositoryTrait: Send + Sync {
    fn get_entry(&self, entry_id: &str) -> Result<AdjustmentEntry>;
    fn list_entries(&self) -> Result<Vec<AdjustmentEntry>>;
    fn list_entries_for_instrument(&self, instrument_code: &str) -> Result<Vec<AdjustmentEntry>>;
    fn list_entries_through(&self, cutoff: NaiveDate) -> Result<Vec<AdjustmentEntry>>;
    async fn append(&self, new_entry: NewAdjustment) -> Result<AdjustmentEntry>;
    async fn remove(&self, entry_id: &str) -> Result<usize>;
    async fn remove_by_instrument_and_date(
        &self,
        instrument_code: &str,
        effective_date: NaiveDate,
        provenance: Option<&str>,
    ) -> Result<Vec<AdjustmentEntry>>;
    async fn remove_by_instrument(&self, instrument_code: &str) -> Result<usize>;
    async fn clear(&self) -> Result<usize>;
    async fn restore(&self, entries: Vec<AdjustmentEntry>) -> Result<usize>;
}

/// Trait for adjustment-journal service operations
#[async_trait]
pub trait JournalServiceTrait: Send + Sync {
    fn get_entry(&self, entry_id: &str) -> Result<AdjustmentEntry>;
    fn list_entries(&self) -> Result<Vec<AdjustmentEntry>>;
    fn list_entries_for_instrument(&self, instrument_code: &str) -> Result<Vec<AdjustmentEntry>>;
    async fn append(&self, new_entry: NewAdjustment) -> Result<AdjustmentEntry>;
    async fn remove(&self, entry_id: &str) -> Result<usize>;
    /// Removes entries for one (instrument, effective date), optionally
    /// restricted to a provenance tag; returns the removed entries.
    async fn remove_for_date(
        &self,
        instrument_code: &str,
        effective_date: NaiveDate,
        provenance: Option<&str>,
    ) -> Result<Vec<AdjustmentEntry>>;
    async fn remove_instrument(&self, instrument_code: &str) -> Result<usize>;
    async fn clear(&self) -> Result<usize>;
}
