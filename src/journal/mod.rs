pub(crate) mod journal_constants;
pub(crate) mod journal_errors;
pub(crate) mod journal_model;
pub(crate) mod journal_repository;
pub(crate) mod journal_service;
pub(crate) mod journal_traits;


pub use journal_constants::*;
pub use journal_errors::JournalError;
pub use journal_model::{AdjustmentEntry, AdjustmentEntryDB, AdjustmentKind, NewAdjustment};
pub use journal_repository::JournalRepository;
pub use journal_service::JournalService;
pub use journal_traits::{JournalRepositoryTrait, JournalServiceTrait};
