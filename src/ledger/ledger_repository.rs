use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::Result;
use crate::ledger::ledger_constants::{SETTLE_STATUS_ESTIMATED_ONLY, SETTLE_STATUS_SETTLED};
use crate::ledger::ledger_errors::LedgerError;
use crate::ledger::ledger_model::{DailyLedgerRow, DailyLedgerRowDB};
use crate::ledger::ledger_traits::LedgerRepositoryTrait;
use crate::schema::daily_ledger;
use crate::utils::{format_date, format_timestamp};

/// Repository for the daily ledger of one account.
///
/// Reads go straight to the pool; mutations run on the account's writer
/// actor so finalize, settle and prune cannot interleave.
pub struct LedgerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    account_id: String,
}

impl LedgerRepository {
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
        date: Option<NaiveDate>,
        since: Option<NaiveDate>,
    ) -> Result<Vec<DailyLedgerRow>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = daily_ledger::table
            .filter(daily_ledger::account_id.eq(&self.account_id))
            .into_boxed();

        if let Some(code) = instrument_code {
            query = query.filter(daily_ledger::instrument_code.eq(code.to_string()));
        }
        if let Some(d) = date {
            query = query.filter(daily_ledger::ledger_date.eq(format_date(d)));
        }
        if let Some(s) = since {
            query = query.filter(daily_ledger::ledger_date.ge(format_date(s)));
        }

        let rows = query
            .order((
                daily_ledger::ledger_date.asc(),
                daily_ledger::instrument_code.asc(),
            ))
            .select(DailyLedgerRowDB::as_select())
            .load::<DailyLedgerRowDB>(&mut conn)?;

        Ok(rows.into_iter().map(DailyLedgerRow::from).collect())
    }
}

#[async_trait]
impl LedgerRepositoryTrait for LedgerRepository {
    fn get_row(&self, date: NaiveDate, instrument_code: &str) -> Result<Option<DailyLedgerRow>> {
        let mut conn = get_connection(&self.pool)?;

        let row = daily_ledger::table
            .find((&self.account_id, format_date(date), instrument_code))
            .select(DailyLedgerRowDB::as_select())
            .first::<DailyLedgerRowDB>(&mut conn)
            .optional()?;

        Ok(row.map(DailyLedgerRow::from))
    }

    fn rows_for_date(&self, date: NaiveDate) -> Result<Vec<DailyLedgerRow>> {
        self.load_ordered(None, Some(date), None)
    }

    fn rows_since(&self, since: NaiveDate) -> Result<Vec<DailyLedgerRow>> {
        self.load_ordered(None, None, Some(since))
    }

    fn rows_for_instrument_since(
        &self,
        instrument_code: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailyLedgerRow>> {
        self.load_ordered(Some(instrument_code), None, Some(since))
    }

    fn list_rows(&self) -> Result<Vec<DailyLedgerRow>> {
        self.load_ordered(None, None, None)
    }

    fn count_pending_between(&self, start: NaiveDate, end: NaiveDate) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;

        let count = daily_ledger::table
            .filter(daily_ledger::account_id.eq(&self.account_id))
            .filter(daily_ledger::settle_status.eq(SETTLE_STATUS_ESTIMATED_ONLY))
            .filter(daily_ledger::ledger_date.ge(format_date(start)))
            .filter(daily_ledger::ledger_date.le(format_date(end)))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count)
    }

    async fn upsert_day_estimates(
        &self,
        date: NaiveDate,
        rows: Vec<DailyLedgerRow>,
    ) -> Result<usize> {
        let account_id = self.account_id.clone();
        let date_str = format_date(date);

        self.writer
            .exec(move |conn| {
                let existing = daily_ledger::table
                    .filter(daily_ledger::account_id.eq(&account_id))
                    .filter(daily_ledger::ledger_date.eq(&date_str))
                    .select(DailyLedgerRowDB::as_select())
                    .load::<DailyLedgerRowDB>(conn)?;

                let settled: HashSet<String> = existing
                    .iter()
                    .filter(|r| r.settle_status != SETTLE_STATUS_ESTIMATED_ONLY)
                    .map(|r| r.instrument_code.clone())
                    .collect();
                let incoming: HashSet<String> =
                    rows.iter().map(|r| r.instrument_code.clone()).collect();

                let mut written = 0usize;
                for row in rows {
                    if settled.contains(&row.instrument_code) {
                        // Terminal rows keep their estimate and official
                        // figures; only the replayed position moves.
                        diesel::update(daily_ledger::table.find((
                            &account_id,
                            &date_str,
                            &row.instrument_code,
                        )))
                        .set((
                            daily_ledger::shares_end.eq(row.shares_end.to_string()),
                            daily_ledger::avg_cost_end.eq(row.avg_cost_end.to_string()),
                            daily_ledger::realized_gain_end
                                .eq(row.realized_gain_end.to_string()),
                            daily_ledger::updated_at.eq(format_timestamp(Utc::now())),
                        ))
                        .execute(conn)?;
                    } else {
                        let mut db_row = DailyLedgerRowDB::from(row);
                        db_row.account_id = account_id.clone();
                        db_row.ledger_date = date_str.clone();
                        diesel::replace_into(daily_ledger::table)
                            .values(&db_row)
                            .execute(conn)?;
                    }
                    written += 1;
                }

                // The snapshot is the source of truth for who holds what:
                // rows for instruments it no longer contains come off.
                let stale: Vec<&String> = existing
                    .iter()
                    .map(|r| &r.instrument_code)
                    .filter(|c| !incoming.contains(*c))
                    .collect();
                if !stale.is_empty() {
                    diesel::delete(
                        daily_ledger::table
                            .filter(daily_ledger::account_id.eq(&account_id))
                            .filter(daily_ledger::ledger_date.eq(&date_str))
                            .filter(daily_ledger::instrument_code.eq_any(stale)),
                    )
                    .execute(conn)?;
                }

                Ok(written)
            })
            .await
    }

    async fn mark_settled(
        &self,
        date: NaiveDate,
        instrument_code: &str,
        official_price: Decimal,
        official_gain: Decimal,
    ) -> Result<DailyLedgerRow> {
        let account_id = self.account_id.clone();
        let date_str = format_date(date);
        let code = instrument_code.to_string();

        let row = self
            .writer
            .exec(move |conn| {
                let current = daily_ledger::table
                    .find((&account_id, &date_str, &code))
                    .select(DailyLedgerRowDB::as_select())
                    .first::<DailyLedgerRowDB>(conn)
                    .optional()?
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!(
                            "No ledger row for {} on {}",
                            code, date_str
                        ))
                    })?;

                if current.settle_status != SETTLE_STATUS_ESTIMATED_ONLY {
                    return Err(LedgerError::AlreadySettled(format!(
                        "Ledger row for {} on {} is already settled",
                        code, date_str
                    ))
                    .into());
                }

                diesel::update(daily_ledger::table.find((&account_id, &date_str, &code)))
                    .set((
                        daily_ledger::official_close_price
                            .eq(Some(official_price.to_string())),
                        daily_ledger::official_close_gain.eq(Some(official_gain.to_string())),
                        daily_ledger::settle_status.eq(SETTLE_STATUS_SETTLED),
                        daily_ledger::updated_at.eq(format_timestamp(Utc::now())),
                    ))
                    .execute(conn)?;

                let updated = daily_ledger::table
                    .find((&account_id, &date_str, &code))
                    .select(DailyLedgerRowDB::as_select())
                    .first::<DailyLedgerRowDB>(conn)?;
                Ok(updated)
            })
            .await?;

        Ok(DailyLedgerRow::from(row))
    }

    async fn remove_instrument_history(&self, instrument_code: &str) -> Result<usize> {
        let account_id = self.account_id.clone();
        let code = instrument_code.to_string();

        self.writer
            .exec(move |conn| {
                let affected = diesel::delete(
                    daily_ledger::table
                        .filter(daily_ledger::account_id.eq(&account_id))
                        .filter(daily_ledger::instrument_code.eq(&code)),
                )
                .execute(conn)?;
                Ok(affected)
            })
            .await
    }
}
