//! SQLite implementation of the availability window store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use roundtable_core::AvailabilityStore;
use roundtable_domain::{AvailableDate, Result, SlotOccurrence};
use rusqlite::params;
use uuid::Uuid;

use super::codec::{encode_date, parse_date, parse_timestamp, parse_uuid};
use super::manager::DbManager;
use super::{map_join_error, map_sql_error};

pub struct SqliteAvailabilityStore {
    db: Arc<DbManager>,
}

impl SqliteAvailabilityStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

type DateRow = (String, String, String, bool, i64, Option<i64>);

fn decode_date_row(row: DateRow) -> Result<AvailableDate> {
    let (id, date, slot_id, is_available, created_at, updated_at) = row;
    Ok(AvailableDate {
        id: parse_uuid(&id)?,
        date: parse_date(&date)?,
        slot_id: parse_uuid(&slot_id)?,
        is_available,
        created_at: parse_timestamp(created_at)?,
        updated_at: updated_at.map(parse_timestamp).transpose()?,
    })
}

#[async_trait]
impl AvailabilityStore for SqliteAvailabilityStore {
    async fn reconcile_window(
        &self,
        today: NaiveDate,
        horizon_days: u32,
        occurrences: Vec<SlotOccurrence>,
    ) -> Result<usize> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let end = today + Duration::days(i64::from(horizon_days));
            let now = Utc::now().timestamp();

            // Prune + upsert as one transaction: a crash leaves either the
            // old window or the new one, never a half-truncated mix.
            let tx = conn.transaction().map_err(map_sql_error)?;

            tx.execute(
                "DELETE FROM available_dates WHERE date < ?1 OR date > ?2",
                params![encode_date(today), encode_date(end)],
            )
            .map_err(map_sql_error)?;

            {
                let mut upsert = tx
                    .prepare(
                        "INSERT INTO available_dates (id, date, slot_id, is_available, created_at)
                         VALUES (?1, ?2, ?3, 1, ?4)
                         ON CONFLICT(date, slot_id) DO NOTHING",
                    )
                    .map_err(map_sql_error)?;

                for occurrence in &occurrences {
                    upsert
                        .execute(params![
                            Uuid::new_v4().to_string(),
                            encode_date(occurrence.date),
                            occurrence.slot_id.to_string(),
                            now,
                        ])
                        .map_err(map_sql_error)?;
                }
            }

            let count: i64 = tx
                .query_row("SELECT COUNT(*) FROM available_dates", [], |row| row.get(0))
                .map_err(map_sql_error)?;

            tx.commit().map_err(map_sql_error)?;
            Ok(count as usize)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_available(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<AvailableDate>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, date, slot_id, is_available, created_at, updated_at
                     FROM available_dates
                     WHERE is_available = 1 AND date >= ?1 AND date <= ?2
                     ORDER BY date",
                )
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![encode_date(from), encode_date(to)], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                })
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<DateRow>>>()
                .map_err(map_sql_error)?;

            rows.into_iter().map(decode_date_row).collect()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find(&self, date: NaiveDate, slot_id: Uuid) -> Result<Option<AvailableDate>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    "SELECT id, date, slot_id, is_available, created_at, updated_at
                     FROM available_dates WHERE date = ?1 AND slot_id = ?2",
                    params![encode_date(date), slot_id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, bool>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, Option<i64>>(5)?,
                        ))
                    },
                )
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })?;

            row.map(decode_date_row).transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_availability(&self, id: Uuid, available: bool) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE available_dates SET is_available = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), available, Utc::now().timestamp()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}
