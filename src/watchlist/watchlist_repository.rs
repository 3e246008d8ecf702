use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::max;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::Result;
use crate::schema::watchlist_items;
use crate::utils::format_timestamp;
use crate::watchlist::watchlist_model::{WatchlistItem, WatchlistItemDB};
use crate::watchlist::watchlist_traits::WatchlistRepositoryTrait;

/// Repository for one account's watchlist.
pub struct WatchlistRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    account_id: String,
}

impl WatchlistRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, account_id: &str) -> Self {
        Self {
            pool,
            writer,
            account_id: account_id.to_string(),
        }
    }
}

#[async_trait]
impl WatchlistRepositoryTrait for WatchlistRepository {
    fn list(&self) -> Result<Vec<WatchlistItem>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = watchlist_items::table
            .filter(watchlist_items::account_id.eq(&self.account_id))
            .order(watchlist_items::position.asc())
            .select(WatchlistItemDB::as_select())
            .load::<WatchlistItemDB>(&mut conn)?;

        Ok(rows.into_iter().map(WatchlistItem::from).collect())
    }

    async fn add(&self, code: &str) -> Result<bool> {
        let account_id = self.account_id.clone();
        let code = code.to_string();

        self.writer
            .exec(move |conn| {
                let existing = watchlist_items::table
                    .find((&account_id, &code))
                    .select(WatchlistItemDB::as_select())
                    .first::<WatchlistItemDB>(conn)
                    .optional()?;
                if existing.is_some() {
                    return Ok(false);
                }

                let max_position: Option<i32> = watchlist_items::table
                    .filter(watchlist_items::account_id.eq(&account_id))
                    .select(max(watchlist_items::position))
                    .first(conn)?;

                let item = WatchlistItemDB {
                    account_id: account_id.clone(),
                    code: code.clone(),
                    position: max_position.map_or(0, |p| p + 1),
                    created_at: format_timestamp(Utc::now()),
                };
                diesel::insert_into(watchlist_items::table)
                    .values(&item)
                    .execute(conn)?;
                Ok(true)
            })
            .await
    }

    async fn remove(&self, code: &str) -> Result<usize> {
        let account_id = self.account_id.clone();
        let code = code.to_string();

        self.writer
            .exec(move |conn| {
                let affected = diesel::delete(
                    watchlist_items::table
                        .filter(watchlist_items::account_id.eq(&account_id))
                        .filter(watchlist_items::code.eq(&code)),
                )
                .execute(conn)?;
                Ok(affected)
            })
            .await
    }
}
