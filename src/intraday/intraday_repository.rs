use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::Result;
use crate::intraday::intraday_model::{IntradayPoint, IntradayPointDB, NewIntradayPoint};
use crate::intraday::intraday_traits::IntradayRepositoryTrait;
use crate::schema::intraday_points;
use crate::utils::format_date;

/// Repository for one account's intraday samples. Append-only aside from
/// the whole-day wipe; the rowid sequence is the within-day ordering.
pub struct IntradayRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    account_id: String,
}

impl IntradayRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, account_id: &str) -> Self {
        Self {
            pool,
            writer,
            account_id: account_id.to_string(),
        }
    }
}

#[async_trait]
impl IntradayRepositoryTrait for IntradayRepository {
    async fn append(&self, point: NewIntradayPoint) -> Result<()> {
        let db_row = point.into_db(&self.account_id);

        self.writer
            .exec(move |conn| {
                diesel::insert_into(intraday_points::table)
                    .values(&db_row)
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    async fn append_marker_once(&self, point: NewIntradayPoint, marker: &str) -> Result<bool> {
        let account_id = self.account_id.clone();
        let date_str = format_date(point.sample_date);
        let target = point.target.clone();
        let marker = marker.to_string();
        let db_row = point.with_marker(&marker).into_db(&self.account_id);

        self.writer
            .exec(move |conn| {
                let existing: i64 = intraday_points::table
                    .filter(intraday_points::account_id.eq(&account_id))
                    .filter(intraday_points::sample_date.eq(&date_str))
                    .filter(intraday_points::target.eq(&target))
                    .filter(intraday_points::marker.eq(&marker))
                    .count()
                    .get_result(conn)?;
                if existing > 0 {
                    return Ok(false);
                }

                diesel::insert_into(intraday_points::table)
                    .values(&db_row)
                    .execute(conn)?;
                Ok(true)
            })
            .await
    }

    fn list(
        &self,
        date: NaiveDate,
        target: &str,
        tail: Option<usize>,
    ) -> Result<Vec<IntradayPoint>> {
        let mut conn = get_connection(&self.pool)?;

        let base = intraday_points::table
            .filter(intraday_points::account_id.eq(&self.account_id))
            .filter(intraday_points::sample_date.eq(format_date(date)))
            .filter(intraday_points::target.eq(target));

        let rows = match tail {
            // Tail reads come newest-first off the index, then flip back.
            Some(n) => {
                let mut rows = base
                    .order(intraday_points::id.desc())
                    .limit(n as i64)
                    .select(IntradayPointDB::as_select())
                    .load::<IntradayPointDB>(&mut conn)?;
                rows.reverse();
                rows
            }
            None => base
                .order(intraday_points::id.asc())
                .select(IntradayPointDB::as_select())
                .load::<IntradayPointDB>(&mut conn)?,
        };

        Ok(rows.into_iter().map(IntradayPoint::from).collect())
    }

    fn last_point(&self, date: NaiveDate, target: &str) -> Result<Option<IntradayPoint>> {
        let mut conn = get_connection(&self.pool)?;

        let row = intraday_points::table
            .filter(intraday_points::account_id.eq(&self.account_id))
            .filter(intraday_points::sample_date.eq(format_date(date)))
            .filter(intraday_points::target.eq(target))
            .order(intraday_points::id.desc())
            .select(IntradayPointDB::as_select())
            .first::<IntradayPointDB>(&mut conn)
            .optional()?;

        Ok(row.map(IntradayPoint::from))
    }

    fn has_marker(&self, date: NaiveDate, target: &str, marker: &str) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;

        let count: i64 = intraday_points::table
            .filter(intraday_points::account_id.eq(&self.account_id))
            .filter(intraday_points::sample_date.eq(format_date(date)))
            .filter(intraday_points::target.eq(target))
            .filter(intraday_points::marker.eq(marker))
            .count()
            .get_result(&mut conn)?;

        Ok(count > 0)
    }

    async fn clear_day(&self, date: NaiveDate) -> Result<usize> {
        let account_id = self.account_id.clone();
        let date_str = format_date(date);

        self.writer
            .exec(move |conn| {
                let affected = diesel::delete(
                    intraday_points::table
                        .filter(intraday_points::account_id.eq(&account_id))
                        .filter(intraday_points::sample_date.eq(&date_str)),
                )
                .execute(conn)?;
                Ok(affected)
            })
            .await
    }
}
