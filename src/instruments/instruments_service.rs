use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{Result, ValidationError};
use crate::instruments::instruments_constants::{
    CATEGORY_ETF, PROFILE_SOURCE_PROVIDER, PROFILE_SOURCE_QUOTE_FALLBACK,
};
use crate::instruments::instruments_model::{guess_passively_tracked, InstrumentProfile};
use crate::instruments::instruments_traits::{InstrumentsRepositoryTrait, InstrumentsServiceTrait};
use crate::market_data::{ProfileProvider, QuoteProvider};

/// Resolves instrument profiles: in-memory memo, then the durable cache,
/// then the profile adapter, then a quote-plus-heuristics fallback.
///
/// Adapter failures never surface here; a degraded fallback profile is
/// cached instead so valuation can always route.
pub struct InstrumentsService {
    repository: Arc<dyn InstrumentsRepositoryTrait>,
    quote_provider: Arc<dyn QuoteProvider>,
    profile_provider: Arc<dyn ProfileProvider>,
    memo: DashMap<String, InstrumentProfile>,
}

impl InstrumentsService {
    pub fn new(
        repository: Arc<dyn InstrumentsRepositoryTrait>,
        quote_provider: Arc<dyn QuoteProvider>,
        profile_provider: Arc<dyn ProfileProvider>,
    ) -> Self {
        Self {
            repository,
            quote_provider,
            profile_provider,
            memo: DashMap::new(),
        }
    }

    async fn build_profile(&self, code: &str) -> InstrumentProfile {
        match self.profile_provider.fetch_instrument_profile(code).await {
            Ok(Some(data)) => {
                let category = data.category.clone().or_else(|| {
                    data.is_passively_tracked.then(|| CATEGORY_ETF.to_string())
                });
                InstrumentProfile {
                    code: code.to_string(),
                    display_name: data.display_name,
                    category,
                    is_passively_tracked: data.is_passively_tracked,
                    is_cross_border: data.is_cross_border,
                    tracked_index: data.tracked_index,
                    source: PROFILE_SOURCE_PROVIDER.to_string(),
                    updated_at: Utc::now(),
                }
            }
            Ok(None) => self.fallback_profile(code).await,
            Err(e) => {
                warn!("Profile adapter failed for {}: {}; using fallback", code, e);
                self.fallback_profile(code).await
            }
        }
    }

    /// The quote feed only contributes a display name; the passive flag comes
    /// from code prefixes and cross-border defaults to false until a real
    /// profile answer arrives.
    async fn fallback_profile(&self, code: &str) -> InstrumentProfile {
        let display_name = match self.quote_provider.fetch_indicative_quote(code).await {
            Ok(quote) => quote.display_name,
            Err(e) => {
                debug!("No quote to name {} with: {}", code, e);
                String::new()
            }
        };

        let passive = guess_passively_tracked(code);
        InstrumentProfile {
            code: code.to_string(),
            display_name,
            category: passive.then(|| CATEGORY_ETF.to_string()),
            is_passively_tracked: passive,
            is_cross_border: false,
            tracked_index: None,
            source: PROFILE_SOURCE_QUOTE_FALLBACK.to_string(),
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl InstrumentsServiceTrait for InstrumentsService {
    async fn get_profile(&self, code: &str) -> Result<InstrumentProfile> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::MissingField("code".to_string()).into());
        }

        if let Some(hit) = self.memo.get(code) {
            return Ok(hit.clone());
        }

        if let Some(stored) = self.repository.get_profile(code)? {
            self.memo.insert(code.to_string(), stored.clone());
            return Ok(stored);
        }

        self.refresh_profile(code).await
    }

    async fn get_profiles(&self, codes: &[String]) -> Result<HashMap<String, InstrumentProfile>> {
        let mut profiles = HashMap::with_capacity(codes.len());
        for code in codes {
            let profile = self.get_profile(code).await?;
            profiles.insert(profile.code.clone(), profile);
        }
        Ok(profiles)
    }

    async fn refresh_profile(&self, code: &str) -> Result<InstrumentProfile> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::MissingField("code".to_string()).into());
        }

        let profile = self.build_profile(code).await;
        let stored = self.repository.upsert_profile(profile).await?;
        self.memo.insert(code.to_string(), stored.clone());
        Ok(stored)
    }
}
