use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::Result;
use crate::instruments::instruments_model::InstrumentProfile;

/// Trait for the instrument profile cache store
#[async_trait]
pub trait InstrumentsRepositoryTrait: Send + Sync {
    fn get_profile(&self, code: &str) -> Result<Option<InstrumentProfile>>;
    fn list_profiles(&self) -> Result<Vec<InstrumentProfile>>;
    async fn upsert_profile(&self, profile: InstrumentProfile) -> Result<InstrumentProfile>;
    async fn delete_profile(&self, code: &str) -> Result<usize>;
}

/// Trait for instrument profile resolution
#[async_trait]
pub trait InstrumentsServiceTrait: Send + Sync {
    async fn get_profile(&self, code: &str) -> Result<InstrumentProfile>;
    async fn get_profiles(&self, codes: &[String]) -> Result<HashMap<String, InstrumentProfile>>;
    async fn refresh_profile(&self, code: &str) -> Result<InstrumentProfile>;
}
