use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::errors::{Error, Result, ValidationError};
use crate::intraday::intraday_constants::MARKER_CLOSE;
use crate::intraday::intraday_model::{IntradayPoint, NewIntradayPoint};
use crate::intraday::intraday_traits::{IntradayRepositoryTrait, IntradayServiceTrait};
use crate::trading_calendar;

/// Service over the intraday sample store. Dates default to the current
/// market date; targets are validated before anything is written.
pub struct IntradayService {
    intraday_repository: Arc<dyn IntradayRepositoryTrait>,
}

impl IntradayService {
    pub fn new(intraday_repository: Arc<dyn IntradayRepositoryTrait>) -> Self {
        Self { intraday_repository }
    }

    fn validated_target(target: &str) -> Result<String> {
        let trimmed = target.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "target".to_string(),
            )));
        }
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl IntradayServiceTrait for IntradayService {
    async fn record_sample(&self, mut point: NewIntradayPoint) -> Result<()> {
        point.target = Self::validated_target(&point.target)?;
        self.intraday_repository.append(point).await
    }

    async fn append_close_marker(&self, mut point: NewIntradayPoint) -> Result<bool> {
        point.target = Self::validated_target(&point.target)?;
        let written = self
            .intraday_repository
            .append_marker_once(point, MARKER_CLOSE)
            .await?;
        if !written {
            log::debug!("Close marker already present; skipping duplicate");
        }
        Ok(written)
    }

    fn get_samples(
        &self,
        target: &str,
        date: Option<NaiveDate>,
        tail: Option<usize>,
    ) -> Result<Vec<IntradayPoint>> {
        let target = Self::validated_target(target)?;
        let date = date.unwrap_or_else(trading_calendar::market_date);
        self.intraday_repository.list(date, &target, tail)
    }

    fn last_sample(&self, target: &str, date: NaiveDate) -> Result<Option<IntradayPoint>> {
        let target = Self::validated_target(target)?;
        self.intraday_repository.last_point(date, &target)
    }

    fn has_close_marker(&self, target: &str, date: Option<NaiveDate>) -> Result<bool> {
        let target = Self::validated_target(target)?;
        let date = date.unwrap_or_else(trading_calendar::market_date);
        self.intraday_repository.has_marker(date, &target, MARKER_CLOSE)
    }

    async fn clear_day(&self, date: Option<NaiveDate>) -> Result<usize> {
        let date = date.unwrap_or_else(trading_calendar::market_date);
        self.intraday_repository.clear_day(date).await
    }
}
