use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::intraday::intraday_model::{IntradayPoint, NewIntradayPoint};

/// Trait for the intraday sample store
#[async_trait]
pub trait IntradayRepositoryTrait: Send + Sync {
    async fn append(&self, point: NewIntradayPoint) -> Result<()>;

    /// Appends only if no point for (date, target) carries this marker yet.
    /// Check and insert run in one writer job, so two racing callers cannot
    /// both write the marker. Returns whether the point was written.
    async fn append_marker_once(&self, point: NewIntradayPoint, marker: &str) -> Result<bool>;

    /// Points for one (date, target) in insertion order. `tail` keeps only
    /// the most recent N, still returned ascending.
    fn list(&self, date: NaiveDate, target: &str, tail: Option<usize>)
        -> Result<Vec<IntradayPoint>>;

    fn last_point(&self, date: NaiveDate, target: &str) -> Result<Option<IntradayPoint>>;
    fn has_marker(&self, date: NaiveDate, target: &str, marker: &str) -> Result<bool>;

    /// Drops every sample of the date, all targets. Returns rows removed.
    async fn clear_day(&self, date: NaiveDate) -> Result<usize>;
}

/// Trait for intraday sample recording and reads
#[async_trait]
pub trait IntradayServiceTrait: Send + Sync {
    async fn record_sample(&self, point: NewIntradayPoint) -> Result<()>;

    /// Stamps the close marker on the point and appends it unless the
    /// (date, target) already has one. Returns whether it was written.
    async fn append_close_marker(&self, point: NewIntradayPoint) -> Result<bool>;

    fn get_samples(
        &self,
        target: &str,
        date: Option<NaiveDate>,
        tail: Option<usize>,
    ) -> Result<Vec<IntradayPoint>>;

    fn last_sample(&self, target: &str, date: NaiveDate) -> Result<Option<IntradayPoint>>;
    fn has_close_marker(&self, target: &str, date: Option<NaiveDate>) -> Result<bool>;
    async fn clear_day(&self, date: Option<NaiveDate>) -> Result<usize>;
}
