use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::{Error, Result, ValidationError};
use crate::watchlist::watchlist_model::WatchlistItem;
use crate::watchlist::watchlist_traits::{WatchlistRepositoryTrait, WatchlistServiceTrait};

pub struct WatchlistService {
    watchlist_repository: Arc<dyn WatchlistRepositoryTrait>,
}

impl WatchlistService {
    pub fn new(watchlist_repository: Arc<dyn WatchlistRepositoryTrait>) -> Self {
        Self {
            watchlist_repository,
        }
    }

    fn validated_code(code: &str) -> Result<String> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "code".to_string(),
            )));
        }
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl WatchlistServiceTrait for WatchlistService {
    fn list(&self) -> Result<Vec<WatchlistItem>> {
        self.watchlist_repository.list()
    }

    fn codes(&self) -> Result<Vec<String>> {
        Ok(self
            .watchlist_repository
            .list()?
            .into_iter()
            .map(|item| item.code)
            .collect())
    }

    async fn add(&self, code: &str) -> Result<Vec<WatchlistItem>> {
        let code = Self::validated_code(code)?;
        let inserted = self.watchlist_repository.add(&code).await?;
        if !inserted {
            log::debug!("{} already on the watchlist", code);
        }
        self.watchlist_repository.list()
    }

    async fn remove(&self, code: &str) -> Result<Vec<WatchlistItem>> {
        let code = Self::validated_code(code)?;
        self.watchlist_repository.remove(&code).await?;
        self.watchlist_repository.list()
    }
}
