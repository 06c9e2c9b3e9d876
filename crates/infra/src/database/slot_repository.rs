//! SQLite implementation of the recurring-slot repository.

use std::sync::Arc;

use async_trait::async_trait;
use roundtable_core::SlotRepository;
use roundtable_domain::{RecurringSlot, Result};
use rusqlite::params;
use uuid::Uuid;

use super::codec::{encode_time, parse_time, parse_timestamp, parse_uuid, parse_weekday};
use super::manager::DbManager;
use super::{map_join_error, map_sql_error};

pub struct SqliteSlotRepository {
    db: Arc<DbManager>,
}

impl SqliteSlotRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

type SlotRow = (String, String, String, String, String, bool, i64);

fn decode_slot(row: SlotRow) -> Result<RecurringSlot> {
    let (id, day_of_week, start_time, end_time, city, active, created_at) = row;
    Ok(RecurringSlot {
        id: parse_uuid(&id)?,
        day_of_week: parse_weekday(&day_of_week)?,
        start_time: parse_time(&start_time)?,
        end_time: parse_time(&end_time)?,
        city,
        active,
        created_at: parse_timestamp(created_at)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, day_of_week, start_time, end_time, city, active, created_at";

#[async_trait]
impl SlotRepository for SqliteSlotRepository {
    async fn insert_slot(&self, slot: &RecurringSlot) -> Result<()> {
        let db = self.db.clone();
        let slot = slot.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO recurring_slots (id, day_of_week, start_time, end_time, city, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    slot.id.to_string(),
                    slot.day_of_week.to_string(),
                    encode_time(slot.start_time),
                    encode_time(slot.end_time),
                    slot.city,
                    slot.active,
                    slot.created_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_slot(&self, id: Uuid) -> Result<Option<RecurringSlot>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM recurring_slots WHERE id = ?1"),
                    params![id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, bool>(5)?,
                            row.get::<_, i64>(6)?,
                        ))
                    },
                )
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })?;

            row.map(decode_slot).transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_active_slots(&self) -> Result<Vec<RecurringSlot>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!("SELECT {SELECT_COLUMNS} FROM recurring_slots WHERE active = 1"))
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                })
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<SlotRow>>>()
                .map_err(map_sql_error)?;

            let mut slots =
                rows.into_iter().map(decode_slot).collect::<Result<Vec<RecurringSlot>>>()?;
            // Weekday ordering lives in the enum, not in SQL collation.
            slots.sort_by_key(|slot| (slot.day_of_week, slot.start_time));
            Ok(slots)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_slot_active(&self, id: Uuid, active: bool) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE recurring_slots SET active = ?2 WHERE id = ?1",
                params![id.to_string(), active],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}
