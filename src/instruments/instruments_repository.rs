use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::Result;
use crate::instruments::instruments_model::{InstrumentProfile, InstrumentProfileDB};
use crate::instruments::instruments_traits::InstrumentsRepositoryTrait;
use crate::schema::instrument_profiles;

/// Durable cache of instrument profiles for one account.
pub struct InstrumentsRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    account_id: String,
}

impl InstrumentsRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, account_id: &str) -> Self {
        Self {
            pool,
            writer,
            account_id: account_id.to_string(),
        }
    }
}

#[async_trait]
impl InstrumentsRepositoryTrait for InstrumentsRepository {
    fn get_profile(&self, code: &str) -> Result<Option<InstrumentProfile>> {
        let mut conn = get_connection(&self.pool)?;

        let row = instrument_profiles::table
            .filter(instrument_profiles::account_id.eq(&self.account_id))
            .filter(instrument_profiles::code.eq(code))
            .select(InstrumentProfileDB::as_select())
            .first::<InstrumentProfileDB>(&mut conn)
            .optional()?;

        Ok(row.map(InstrumentProfile::from))
    }

    fn list_profiles(&self) -> Result<Vec<InstrumentProfile>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = instrument_profiles::table
            .filter(instrument_profiles::account_id.eq(&self.account_id))
            .order(instrument_profiles::code.asc())
            .select(InstrumentProfileDB::as_select())
            .load::<InstrumentProfileDB>(&mut conn)?;

        Ok(rows.into_iter().map(InstrumentProfile::from).collect())
    }

    async fn upsert_profile(&self, profile: InstrumentProfile) -> Result<InstrumentProfile> {
        let row = profile.into_db(&self.account_id);

        self.writer
            .exec(move |conn| {
                diesel::replace_into(instrument_profiles::table)
                    .values(&row)
                    .execute(conn)?;
                Ok(row)
            })
            .await
            .map(InstrumentProfile::from)
    }

    async fn delete_profile(&self, code: &str) -> Result<usize> {
        let account_id = self.account_id.clone();
        let code = code.to_string();

        self.writer
            .exec(move |conn| {
                let affected = diesel::delete(
                    instrument_profiles::table
                        .filter(instrument_profiles::account_id.eq(&account_id))
                        .filter(instrument_profiles::code.eq(&code)),
                )
                .execute(conn)?;
                Ok(affected)
            })
            .await
    }
}
