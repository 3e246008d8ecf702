use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::Result;
use crate::valuation::valuation_model::EstimateResult;

/// Trait for the valuation router
#[async_trait]
pub trait ValuationServiceTrait: Send + Sync {
    async fn estimate_one(&self, code: &str) -> Result<EstimateResult>;
    async fn estimate_many(&self, codes: &[String]) -> Result<HashMap<String, EstimateResult>>;
}
