pub(crate) mod valuation_constants;
pub(crate) mod valuation_model;
pub(crate) mod valuation_service;
pub(crate) mod valuation_strategies;
pub(crate) mod valuation_traits;

#[cfg(test)]
mod valuation_strategies_tests;

pub use valuation_constants::*;
pub use valuation_model::{EstimateResult, EstimationContext};
pub use valuation_service::ValuationService;
pub use valuation_strategies::{
    default_strategy_chain, EstimationStrategy, FrozenStrategy, HoldingsSynthesisStrategy,
    IndicativeFallbackStrategy, PassiveTrackerStrategy,
};
pub use valuation_traits::ValuationServiceTrait;
