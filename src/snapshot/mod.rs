pub(crate) mod edit_service;
pub(crate) mod replay_calculator;
pub(crate) mod snapshot_model;
pub(crate) mod snapshot_service;
pub(crate) mod snapshot_traits;

#[cfg(test)]
mod edit_service_tests;

pub use edit_service::EditService;
pub use replay_calculator::ReplayCalculator;
pub use snapshot_model::{
    EditOutcome, PositionEdit, PositionSnapshot, ReplayWarning, SnapshotResult,
};
pub use snapshot_service::SnapshotService;
pub use snapshot_traits::{EditServiceTrait, SnapshotServiceTrait};
