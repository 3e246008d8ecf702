use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::{format_timestamp, parse_timestamp_tolerant};

/// One watched instrument. `position` is the display/sampling order; gaps
/// left by removals are fine, only the relative order matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub account_id: String,
    pub code: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::watchlist_items)]
#[diesel(primary_key(account_id, code))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WatchlistItemDB {
    pub account_id: String,
    pub code: String,
    pub position: i32,
    pub created_at: String,
}

impl From<WatchlistItemDB> for WatchlistItem {
    fn from(db: WatchlistItemDB) -> Self {
        Self {
            account_id: db.account_id,
            code: db.code,
            position: db.position,
            created_at: parse_timestamp_tolerant(&db.created_at, "watchlist_items.created_at"),
        }
    }
}

impl From<WatchlistItem> for WatchlistItemDB {
    fn from(domain: WatchlistItem) -> Self {
        Self {
            account_id: domain.account_id,
            code: domain.code,
            position: domain.position,
            created_at: format_timestamp(domain.created_at),
        }
    }
}
