pub(crate) mod accuracy_service;
pub(crate) mod ledger_constants;
pub(crate) mod ledger_errors;
pub(crate) mod ledger_model;
pub(crate) mod ledger_repository;
pub(crate) mod ledger_traits;
pub(crate) mod settlement_service;

#[cfg(test)]
mod accuracy_service_tests;

pub use accuracy_service::AccuracyService;
pub use ledger_constants::*;
pub use ledger_errors::LedgerError;
pub use ledger_model::{
    close_gain, AccuracySummary, DailyLedgerRow, DailyLedgerRowDB, GapRow,
    PortfolioAccuracySummary, PortfolioGapRow, SettleStatus,
};
pub use ledger_repository::LedgerRepository;
pub use ledger_traits::{AccuracyServiceTrait, LedgerRepositoryTrait, SettlementServiceTrait};
pub use settlement_service::SettlementService;
