use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::Result;
use crate::journal::journal_errors::JournalError;
use crate::journal::journal_model::{AdjustmentEntry, AdjustmentEntryDB, NewAdjustment};
use crate::journal::journal_traits::JournalRepositoryTrait;
use crate::schema::adjustments;
use crate::utils::format_date;

/// Repository for the append-only adjustment journal of one account.
///
/// Reads go straight to the pool; every mutation is funneled through the
/// account's writer actor so concurrent edits cannot interleave.
pub struct JournalRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    account_id: String,
}

impl JournalRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, account_id: &str) -> Self {
        Self {
            pool,
            writer,
            account_id: account_id.to_string(),
        }
    }

    fn load_ordered(
        &self,
        instrument_code: Option<&str>,
        through: Option<NaiveDate>,
    ) -> Result<Vec<AdjustmentEntry>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = adjustments::table
            .filter(adjustments::account_id.eq(&self.account_id))
            .into_boxed();

        if let Some(code) = instrument_code {
            query = query.filter(adjustments::instrument_code.eq(code.to_string()));
        }
        if let Some(cutoff) = through {
            query = query.filter(adjustments::effective_date.le(format_date(cutoff)));
        }

        // Replay order: effective date first, insertion order as tie-break.
        let rows = query
            .order((
                adjustments::effective_date.asc(),
                adjustments::created_at.asc(),
                adjustments::id.asc(),
            ))
            .select(AdjustmentEntryDB::as_select())
            .load::<AdjustmentEntryDB>(&mut conn)?;

        Ok(rows.into_iter().map(AdjustmentEntry::from).collect())
    }
}

#[async_trait]
impl JournalRepositoryTrait for JournalRepository {
    fn get_entry(&self, entry_id: &str) -> Result<AdjustmentEntry> {
        let mut conn = get_connection(&self.pool)?;

        let row = adjustments::table
            .filter(adjustments::id.eq(entry_id))
            .filter(adjustments::account_id.eq(&self.account_id))
            .select(AdjustmentEntryDB::as_select())
            .first::<AdjustmentEntryDB>(&mut conn)
            .optional()?
            .ok_or_else(|| {
                JournalError::NotFound(format!("Adjustment entry {} not found", entry_id))
            })?;

        Ok(AdjustmentEntry::from(row))
    }

    fn list_entries(&self) -> Result<Vec<AdjustmentEntry>> {
        self.load_ordered(None, None)
    }

    fn list_entries_for_instrument(&self, instrument_code: &str) -> Result<Vec<AdjustmentEntry>> {
        self.load_ordered(Some(instrument_code), None)
    }

    fn list_entries_through(&self, cutoff: NaiveDate) -> Result<Vec<AdjustmentEntry>> {
        self.load_ordered(None, Some(cutoff))
    }

    async fn append(&self, new_entry: NewAdjustment) -> Result<AdjustmentEntry> {
        let row = new_entry.into_db(&self.account_id, Uuid::new_v4().to_string(), Utc::now());

        self.writer
            .exec(move |conn| {
                diesel::insert_into(adjustments::table)
                    .values(&row)
                    .execute(conn)?;
                Ok(row)
            })
            .await
            .map(AdjustmentEntry::from)
    }

    async fn remove(&self, entry_id: &str) -> Result<usize> {
        let account_id = self.account_id.clone();
        let entry_id = entry_id.to_string();

        // Removing an id that is absent (or not ours) is a no-op.
        self.writer
            .exec(move |conn| {
                let affected = diesel::delete(
                    adjustments::table
                        .filter(adjustments::id.eq(&entry_id))
                        .filter(adjustments::account_id.eq(&account_id)),
                )
                .execute(conn)?;
                Ok(affected)
            })
            .await
    }

    async fn remove_by_instrument_and_date(
        &self,
        instrument_code: &str,
        effective_date: NaiveDate,
        provenance: Option<&str>,
    ) -> Result<Vec<AdjustmentEntry>> {
        let account_id = self.account_id.clone();
        let code = instrument_code.to_string();
        let date = format_date(effective_date);
        let provenance = provenance.map(|p| p.to_string());

        let removed = self
            .writer
            .exec(move |conn| {
                let mut query = adjustments::table
                    .filter(adjustments::account_id.eq(&account_id))
                    .filter(adjustments::instrument_code.eq(&code))
                    .filter(adjustments::effective_date.eq(&date))
                    .into_boxed();
                if let Some(tag) = provenance.clone() {
                    query = query.filter(adjustments::provenance.eq(tag));
                }

                let rows = query
                    .order(adjustments::created_at.asc())
                    .select(AdjustmentEntryDB::as_select())
                    .load::<AdjustmentEntryDB>(conn)?;

                if !rows.is_empty() {
                    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
                    diesel::delete(adjustments::table.filter(adjustments::id.eq_any(&ids)))
                        .execute(conn)?;
                }
                Ok(rows)
            })
            .await?;

        Ok(removed.into_iter().map(AdjustmentEntry::from).collect())
    }

    async fn remove_by_instrument(&self, instrument_code: &str) -> Result<usize> {
        let account_id = self.account_id.clone();
        let code = instrument_code.to_string();

        self.writer
            .exec(move |conn| {
                let affected = diesel::delete(
                    adjustments::table
                        .filter(adjustments::account_id.eq(&account_id))
                        .filter(adjustments::instrument_code.eq(&code)),
                )
                .execute(conn)?;
                Ok(affected)
            })
            .await
    }

    async fn clear(&self) -> Result<usize> {
        let account_id = self.account_id.clone();

        self.writer
            .exec(move |conn| {
                let affected = diesel::delete(
                    adjustments::table.filter(adjustments::account_id.eq(&account_id)),
                )
                .execute(conn)?;
                Ok(affected)
            })
            .await
    }

    async fn restore(&self, entries: Vec<AdjustmentEntry>) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let rows: Vec<AdjustmentEntryDB> =
            entries.into_iter().map(AdjustmentEntryDB::from).collect();

        // Rows keep their original ids and created_at stamps so replay order
        // is identical to what it was before they were removed.
        self.writer
            .exec(move |conn| {
                let inserted = diesel::insert_into(adjustments::table)
                    .values(&rows)
                    .execute(conn)?;
                Ok(inserted)
            })
            .await
    }
}
