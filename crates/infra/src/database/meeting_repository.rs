//! SQLite implementation of the meeting repository.
//!
//! Meeting deletion is transactional: the roster cascades away and every
//! application the meeting satisfied is reverted to pending in the same
//! transaction, so affected users are never silently lost.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use roundtable_core::MeetingRepository;
use roundtable_domain::{
    Meeting, MeetingMember, MeetingStatus, RecurringSlot, Result, RoundtableError, UserId,
};
use rusqlite::params;
use uuid::Uuid;

use super::codec::{
    encode_date, encode_time, parse_date, parse_time, parse_timestamp, parse_uuid, parse_weekday,
};
use super::manager::DbManager;
use super::{map_join_error, map_sql_error};

pub struct SqliteMeetingRepository {
    db: Arc<DbManager>,
}

impl SqliteMeetingRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

type MeetingRow =
    (String, String, String, String, String, String, Option<String>, String, Option<i64>, i64);

fn decode_meeting(row: MeetingRow) -> Result<Meeting> {
    let (id, name, date, time, city, venue, venue_address, status, created_by, created_at) = row;
    Ok(Meeting {
        id: parse_uuid(&id)?,
        name,
        date: parse_date(&date)?,
        time: parse_time(&time)?,
        city,
        venue,
        venue_address,
        status: status.parse::<MeetingStatus>().map_err(RoundtableError::Database)?,
        created_by,
        created_at: parse_timestamp(created_at)?,
    })
}

const SELECT_COLUMNS: &str = "id, name, meeting_date, meeting_time, city, venue, venue_address, \
                              status, created_by, created_at";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MeetingRow> {
    Ok((
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, String>(4)?,
        row.get::<_, String>(5)?,
        row.get::<_, Option<String>>(6)?,
        row.get::<_, String>(7)?,
        row.get::<_, Option<i64>>(8)?,
        row.get::<_, i64>(9)?,
    ))
}

#[async_trait]
impl MeetingRepository for SqliteMeetingRepository {
    async fn insert(&self, meeting: &Meeting) -> Result<()> {
        let db = self.db.clone();
        let meeting = meeting.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO meetings (id, name, meeting_date, meeting_time, city, venue, venue_address, status, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    meeting.id.to_string(),
                    meeting.name,
                    encode_date(meeting.date),
                    encode_time(meeting.time),
                    meeting.city,
                    meeting.venue,
                    meeting.venue_address,
                    meeting.status.to_string(),
                    meeting.created_by,
                    meeting.created_at.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: Uuid) -> Result<Option<Meeting>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM meetings WHERE id = ?1"),
                    params![id.to_string()],
                    read_row,
                )
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })?;

            row.map(decode_meeting).transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_status(&self, id: Uuid, status: MeetingStatus) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE meetings SET status = ?2 WHERE id = ?1",
                    params![id.to_string(), status.to_string()],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(RoundtableError::NotFound(format!("meeting {id} no longer exists")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_with_revert(&self, id: Uuid) -> Result<usize> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            let meeting_id = id.to_string();

            // Applications of roster members go back to pending. When the
            // meeting is linked to a slot, only applications for that slot
            // are affected; otherwise every approved application of a
            // roster member is.
            let reverted = tx
                .execute(
                    "UPDATE applications SET status = 'pending', decided_at = NULL
                     WHERE status = 'approved'
                       AND user_id IN (SELECT user_id FROM meeting_members WHERE meeting_id = ?1)
                       AND (
                           slot_id IN (SELECT slot_id FROM meeting_slots WHERE meeting_id = ?1)
                           OR NOT EXISTS (SELECT 1 FROM meeting_slots WHERE meeting_id = ?1)
                       )",
                    params![meeting_id],
                )
                .map_err(map_sql_error)?;

            // Members, slot links and ledger rows cascade via foreign keys.
            tx.execute("DELETE FROM meetings WHERE id = ?1", params![meeting_id])
                .map_err(map_sql_error)?;

            tx.commit().map_err(map_sql_error)?;
            Ok(reverted)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn add_member(&self, member: &MeetingMember) -> Result<bool> {
        let db = self.db.clone();
        let member = member.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO meeting_members (meeting_id, user_id, display_name, joined_at, added_by)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        member.meeting_id.to_string(),
                        member.user_id,
                        member.display_name,
                        member.joined_at.timestamp(),
                        member.added_by,
                    ],
                )
                .map_err(map_sql_error)?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn remove_member(&self, meeting_id: Uuid, user_id: UserId) -> Result<bool> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let removed = conn
                .execute(
                    "DELETE FROM meeting_members WHERE meeting_id = ?1 AND user_id = ?2",
                    params![meeting_id.to_string(), user_id],
                )
                .map_err(map_sql_error)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn members(&self, meeting_id: Uuid) -> Result<Vec<MeetingMember>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT meeting_id, user_id, display_name, joined_at, added_by
                     FROM meeting_members WHERE meeting_id = ?1 ORDER BY joined_at",
                )
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![meeting_id.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                })
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;

            rows.into_iter()
                .map(|(meeting_id, user_id, display_name, joined_at, added_by)| {
                    Ok(MeetingMember {
                        meeting_id: parse_uuid(&meeting_id)?,
                        user_id,
                        display_name,
                        joined_at: parse_timestamp(joined_at)?,
                        added_by,
                    })
                })
                .collect()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn link_slot(&self, meeting_id: Uuid, slot_id: Uuid) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR IGNORE INTO meeting_slots (meeting_id, slot_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![meeting_id.to_string(), slot_id.to_string(), Utc::now().timestamp()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn linked_slot(&self, meeting_id: Uuid) -> Result<Option<RecurringSlot>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    "SELECT s.id, s.day_of_week, s.start_time, s.end_time, s.city, s.active, s.created_at
                     FROM meeting_slots ms
                     JOIN recurring_slots s ON s.id = ms.slot_id
                     WHERE ms.meeting_id = ?1
                     LIMIT 1",
                    params![meeting_id.to_string()],
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

            row.map(|(id, day_of_week, start_time, end_time, city, active, created_at)| {
                Ok(RecurringSlot {
                    id: parse_uuid(&id)?,
                    day_of_week: parse_weekday(&day_of_week)?,
                    start_time: parse_time(&start_time)?,
                    end_time: parse_time(&end_time)?,
                    city,
                    active,
                    created_at: parse_timestamp(created_at)?,
                })
            })
            .transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn confirmed_on_date(&self, date: NaiveDate) -> Result<Vec<Meeting>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM meetings
                     WHERE meeting_date = ?1 AND status = 'confirmed'"
                ))
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![encode_date(date)], read_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<MeetingRow>>>()
                .map_err(map_sql_error)?;

            rows.into_iter().map(decode_meeting).collect()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn confirmed_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Meeting>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            // The band may straddle midnight, so select by date range and
            // compare the exact instant in Rust.
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM meetings
                     WHERE meeting_date >= ?1 AND meeting_date <= ?2 AND status = 'confirmed'"
                ))
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![encode_date(from.date()), encode_date(to.date())], read_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<MeetingRow>>>()
                .map_err(map_sql_error)?;

            let meetings = rows
                .into_iter()
                .map(decode_meeting)
                .collect::<Result<Vec<Meeting>>>()?;

            Ok(meetings
                .into_iter()
                .filter(|meeting| meeting.starts_at() >= from && meeting.starts_at() <= to)
                .collect())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn open_meetings_before(&self, date: NaiveDate) -> Result<Vec<Meeting>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM meetings
                     WHERE meeting_date < ?1 AND status IN ('planned', 'confirmed')"
                ))
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![encode_date(date)], read_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<MeetingRow>>>()
                .map_err(map_sql_error)?;

            rows.into_iter().map(decode_meeting).collect()
        })
        .await
        .map_err(map_join_error)?
    }
}
