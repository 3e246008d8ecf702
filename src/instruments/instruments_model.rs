use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::instruments::instruments_constants::PASSIVE_TRACKER_CODE_PREFIXES;
use crate::utils::{format_timestamp, parse_timestamp_tolerant};

/// Cached static metadata for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentProfile {
    pub code: String,
    pub display_name: String,
    pub category: Option<String>,
    pub is_passively_tracked: bool,
    pub is_cross_border: bool,
    pub tracked_index: Option<String>,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::instrument_profiles)]
#[diesel(primary_key(account_id, code))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct InstrumentProfileDB {
    pub account_id: String,
    pub code: String,
    pub display_name: String,
    pub category: Option<String>,
    pub is_passively_tracked: bool,
    pub is_cross_border: bool,
    pub tracked_index: Option<String>,
    pub source: String,
    pub updated_at: String,
}

impl InstrumentProfile {
    pub(crate) fn into_db(self, account_id: &str) -> InstrumentProfileDB {
        InstrumentProfileDB {
            account_id: account_id.to_string(),
            code: self.code,
            display_name: self.display_name,
            category: self.category,
            is_passively_tracked: self.is_passively_tracked,
            is_cross_border: self.is_cross_border,
            tracked_index: self.tracked_index,
            source: self.source,
            updated_at: format_timestamp(self.updated_at),
        }
    }
}

impl From<InstrumentProfileDB> for InstrumentProfile {
    fn from(db: InstrumentProfileDB) -> Self {
        Self {
            code: db.code,
            display_name: db.display_name,
            category: db.category,
            is_passively_tracked: db.is_passively_tracked,
            is_cross_border: db.is_cross_border,
            tracked_index: db.tracked_index,
            source: db.source,
            updated_at: parse_timestamp_tolerant(&db.updated_at, "instrument_profiles.updated_at"),
        }
    }
}

/// Guesses whether a code denotes a passively tracked exchange fund from its
/// exchange prefix. Used only when no profile adapter answer is available.
pub fn guess_passively_tracked(code: &str) -> bool {
    let code = code.trim();
    if code.len() < 3 {
        return false;
    }
    PASSIVE_TRACKER_CODE_PREFIXES
        .iter()
        .any(|prefix| code.starts_with(prefix))
}
