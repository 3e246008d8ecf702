use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::snapshot::snapshot_model::{EditOutcome, PositionEdit, SnapshotResult};

/// Trait for replay-derived snapshot queries
pub trait SnapshotServiceTrait: Send + Sync {
    fn positions_as_of(&self, as_of: NaiveDate) -> Result<SnapshotResult>;
}

/// Trait for the position edit bridge
#[async_trait]
pub trait EditServiceTrait: Send + Sync {
    async fn apply_edit(&self, edit: PositionEdit) -> Result<EditOutcome>;
}
