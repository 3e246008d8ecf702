use chrono::NaiveDate;
use std::sync::Arc;

use crate::errors::Result;
use crate::journal::JournalRepositoryTrait;
use crate::snapshot::replay_calculator::ReplayCalculator;
use crate::snapshot::snapshot_model::SnapshotResult;
use crate::snapshot::snapshot_traits::SnapshotServiceTrait;

/// Computes position snapshots by replaying the adjustment journal.
pub struct SnapshotService {
    journal_repository: Arc<dyn JournalRepositoryTrait>,
    calculator: ReplayCalculator,
}

impl SnapshotService {
    pub fn new(journal_repository: Arc<dyn JournalRepositoryTrait>) -> Self {
        Self {
            journal_repository,
            calculator: ReplayCalculator::new(),
        }
    }
}

impl SnapshotServiceTrait for SnapshotService {
    fn positions_as_of(&self, as_of: NaiveDate) -> Result<SnapshotResult> {
        let entries = self.journal_repository.list_entries_through(as_of)?;
        Ok(self.calculator.replay(&entries, as_of))
    }
}
