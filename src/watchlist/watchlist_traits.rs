use async_trait::async_trait;

use crate::errors::Result;
use crate::watchlist::watchlist_model::WatchlistItem;

/// Trait for the watchlist store
#[async_trait]
pub trait WatchlistRepositoryTrait: Send + Sync {
    /// Items in watch order.
    fn list(&self) -> Result<Vec<WatchlistItem>>;

    /// Appends the code at the end of the list; duplicate codes are left
    /// where they are. Returns whether a new item was inserted.
    async fn add(&self, code: &str) -> Result<bool>;

    async fn remove(&self, code: &str) -> Result<usize>;
}

/// Trait for watchlist maintenance
#[async_trait]
pub trait WatchlistServiceTrait: Send + Sync {
    fn list(&self) -> Result<Vec<WatchlistItem>>;

    /// Watched instrument codes in order; what the sampling loop feeds on.
    fn codes(&self) -> Result<Vec<String>>;

    async fn add(&self, code: &str) -> Result<Vec<WatchlistItem>>;
    async fn remove(&self, code: &str) -> Result<Vec<WatchlistItem>>;
}
