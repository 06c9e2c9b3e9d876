//! SQLite implementation of the application repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use roundtable_core::ApplicationRepository;
use roundtable_domain::{Application, ApplicationStatus, Result, RoundtableError, UserId};
use rusqlite::params;
use uuid::Uuid;

use super::codec::{parse_timestamp, parse_uuid};
use super::manager::DbManager;
use super::{map_join_error, map_sql_error};

pub struct SqliteApplicationRepository {
    db: Arc<DbManager>,
}

impl SqliteApplicationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

type ApplicationRow = (String, i64, String, String, Option<String>, i64, Option<i64>);

fn decode_application(row: ApplicationRow) -> Result<Application> {
    let (id, user_id, slot_id, status, admin_note, created_at, decided_at) = row;
    Ok(Application {
        id: parse_uuid(&id)?,
        user_id,
        slot_id: parse_uuid(&slot_id)?,
        status: status
            .parse::<ApplicationStatus>()
            .map_err(RoundtableError::Database)?,
        admin_note,
        created_at: parse_timestamp(created_at)?,
        decided_at: decided_at.map(parse_timestamp).transpose()?,
    })
}

const SELECT_COLUMNS: &str = "id, user_id, slot_id, status, admin_note, created_at, decided_at";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok((
        row.get::<_, String>(0)?,
        row.get::<_, i64>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, Option<String>>(4)?,
        row.get::<_, i64>(5)?,
        row.get::<_, Option<i64>>(6)?,
    ))
}

#[async_trait]
impl ApplicationRepository for SqliteApplicationRepository {
    async fn insert(&self, application: &Application) -> Result<()> {
        let db = self.db.clone();
        let application = application.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO applications (id, user_id, slot_id, status, admin_note, created_at, decided_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    application.id.to_string(),
                    application.user_id,
                    application.slot_id.to_string(),
                    application.status.to_string(),
                    application.admin_note,
                    application.created_at.timestamp(),
                    application.decided_at.map(|at| at.timestamp()),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: Uuid) -> Result<Option<Application>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM applications WHERE id = ?1"),
                    params![id.to_string()],
                    read_row,
                )
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })?;

            row.map(decode_application).transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_open(&self, user_id: UserId, slot_id: Uuid) -> Result<Option<Application>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {SELECT_COLUMNS} FROM applications
                         WHERE user_id = ?1 AND slot_id = ?2 AND status != 'cancelled'
                         LIMIT 1"
                    ),
                    params![user_id, slot_id.to_string()],
                    read_row,
                )
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })?;

            row.map(decode_application).transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        note: Option<String>,
    ) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let decided_at =
                if status.is_decided() { Some(Utc::now().timestamp()) } else { None };
            conn.execute(
                "UPDATE applications SET status = ?2, admin_note = ?3, decided_at = ?4 WHERE id = ?1",
                params![id.to_string(), status.to_string(), note, decided_at],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Application>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM applications
                     WHERE user_id = ?1 ORDER BY created_at DESC"
                ))
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![user_id], read_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<ApplicationRow>>>()
                .map_err(map_sql_error)?;

            rows.into_iter().map(decode_application).collect()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_pending_for_slot(&self, slot_id: Uuid) -> Result<Vec<Application>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM applications
                     WHERE slot_id = ?1 AND status = 'pending' ORDER BY created_at"
                ))
                .map_err(map_sql_error)?;

            let rows = stmt
                .query_map(params![slot_id.to_string()], read_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<ApplicationRow>>>()
                .map_err(map_sql_error)?;

            rows.into_iter().map(decode_application).collect()
        })
        .await
        .map_err(map_join_error)?
    }
}
