use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{Error, Result, ValidationError};
use crate::instruments::{InstrumentProfile, InstrumentsServiceTrait};
use crate::market_data::{normalize_constituent_code, ProfileProvider, QuoteProvider};
use crate::trading_calendar;
use crate::valuation::valuation_constants::{CONFIDENCE_FROZEN, METHOD_FROZEN_OFFICIAL, POLL_SECS_FROZEN};
use crate::valuation::valuation_model::{EstimateResult, EstimationContext};
use crate::valuation::valuation_strategies::{default_strategy_chain, EstimationStrategy};
use crate::valuation::valuation_traits::ValuationServiceTrait;

/// Routes each instrument through the estimation tiers, prefetching every
/// external input once per batch.
///
/// Adapter failures degrade the affected instruments to the frozen tier;
/// they never fail the batch. Only storage problems surface as errors.
pub struct ValuationService {
    quote_provider: Arc<dyn QuoteProvider>,
    profile_provider: Arc<dyn ProfileProvider>,
    instruments_service: Arc<dyn InstrumentsServiceTrait>,
    strategies: Vec<Box<dyn EstimationStrategy>>,
}

impl ValuationService {
    pub fn new(
        quote_provider: Arc<dyn QuoteProvider>,
        profile_provider: Arc<dyn ProfileProvider>,
        instruments_service: Arc<dyn InstrumentsServiceTrait>,
    ) -> Self {
        Self {
            quote_provider,
            profile_provider,
            instruments_service,
            strategies: default_strategy_chain(),
        }
    }

    /// One round of external fetches for the whole batch: indicative quotes
    /// once, holdings once per eligible instrument, constituent quotes once
    /// for the union, latest official prices only where the quote carries
    /// none.
    async fn build_context(&self, codes: &[String]) -> Result<EstimationContext> {
        let market_now = trading_calendar::now_market();
        let in_market_hours = trading_calendar::is_market_open(&market_now);

        let quotes = match self.quote_provider.fetch_indicative_quotes(codes).await {
            Ok(map) => map,
            Err(e) => {
                warn!("Batch quote fetch failed: {}; instruments degrade to frozen", e);
                HashMap::new()
            }
        };

        let profiles = self.instruments_service.get_profiles(codes).await?;

        let eligible: Vec<String> = codes
            .iter()
            .filter(|code| {
                profiles
                    .get(code.as_str())
                    .map(|p| !p.is_passively_tracked && !p.is_cross_border)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        let fetches: Vec<_> = eligible
            .iter()
            .map(|code| self.profile_provider.fetch_holdings(code))
            .collect();
        let mut holdings = HashMap::new();
        for (code, fetched) in eligible.iter().zip(futures::future::join_all(fetches).await) {
            match fetched {
                Ok(Some(disclosure)) if !disclosure.holdings.is_empty() => {
                    holdings.insert(code.clone(), disclosure);
                }
                Ok(_) => {}
                Err(e) => debug!("Holdings fetch failed for {}: {}", code, e),
            }
        }

        let mut constituent_codes: Vec<String> = holdings
            .values()
            .flat_map(|d| d.holdings.iter())
            .map(|h| normalize_constituent_code(&h.constituent_code))
            .filter(|c| !c.is_empty())
            .collect();
        constituent_codes.sort();
        constituent_codes.dedup();

        let constituent_quotes = if constituent_codes.is_empty() {
            HashMap::new()
        } else {
            match self
                .quote_provider
                .fetch_constituent_quotes(&constituent_codes)
                .await
            {
                // Key by normalized code so disclosure lookups always hit.
                Ok(map) => map
                    .into_iter()
                    .map(|(k, v)| (normalize_constituent_code(&k), v))
                    .collect(),
                Err(e) => {
                    warn!("Constituent quote fetch failed: {}", e);
                    HashMap::new()
                }
            }
        };

        let without_embedded: Vec<String> = codes
            .iter()
            .filter(|code| {
                !quotes
                    .get(code.as_str())
                    .and_then(|q| q.last_official_price)
                    .map(|p| p > Decimal::ZERO)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        let fetches: Vec<_> = without_embedded
            .iter()
            .map(|code| self.quote_provider.fetch_latest_official_price(code))
            .collect();
        let mut latest_official = HashMap::new();
        for (code, fetched) in without_embedded
            .iter()
            .zip(futures::future::join_all(fetches).await)
        {
            match fetched {
                Ok(Some(official)) => {
                    latest_official.insert(code.clone(), official);
                }
                Ok(None) => {}
                Err(e) => debug!("Latest official price fetch failed for {}: {}", code, e),
            }
        }

        Ok(EstimationContext {
            now: Utc::now(),
            in_market_hours,
            quotes,
            profiles,
            holdings,
            constituent_quotes,
            latest_official,
        })
    }

    fn route(&self, code: &str, ctx: &EstimationContext) -> EstimateResult {
        let neutral_profile = InstrumentProfile {
            code: code.to_string(),
            display_name: String::new(),
            category: None,
            is_passively_tracked: false,
            is_cross_border: false,
            tracked_index: None,
            source: String::new(),
            updated_at: ctx.now,
        };
        let profile = ctx.profile(code).unwrap_or(&neutral_profile);

        let display_name = Some(profile.display_name.clone())
            .filter(|n| !n.is_empty())
            .or_else(|| {
                ctx.quote(code)
                    .map(|q| q.display_name.clone())
                    .filter(|n| !n.is_empty())
            })
            .unwrap_or_else(|| code.to_string());

        for strategy in &self.strategies {
            if let Some(result) = strategy.estimate(code, &display_name, profile, ctx) {
                return result;
            }
        }

        // The chain ends with the frozen tier, which always answers; this
        // only runs with a misconfigured chain.
        EstimateResult {
            instrument_code: code.to_string(),
            display_name,
            estimated_price: Decimal::ZERO,
            estimated_change_pct: Decimal::ZERO,
            method: METHOD_FROZEN_OFFICIAL.to_string(),
            confidence: CONFIDENCE_FROZEN,
            as_of_time: ctx.now,
            warning: Some("no estimation tier applied".to_string()),
            suggested_poll_secs: POLL_SECS_FROZEN,
            coverage_pct: None,
        }
    }
}

#[async_trait]
impl ValuationServiceTrait for ValuationService {
    async fn estimate_one(&self, code: &str) -> Result<EstimateResult> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::MissingField("code".to_string()).into());
        }

        let mut results = self.estimate_many(&[code.to_string()]).await?;
        results.remove(code).ok_or_else(|| {
            Error::Validation(ValidationError::InvalidInput(format!(
                "no estimate produced for {}",
                code
            )))
        })
    }

    async fn estimate_many(&self, codes: &[String]) -> Result<HashMap<String, EstimateResult>> {
        let mut codes: Vec<String> = codes
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        codes.sort();
        codes.dedup();
        if codes.is_empty() {
            return Ok(HashMap::new());
        }

        let ctx = self.build_context(&codes).await?;

        let mut results = HashMap::with_capacity(codes.len());
        for code in &codes {
            results.insert(code.clone(), self.route(code, &ctx));
        }
        Ok(results)
    }
}
