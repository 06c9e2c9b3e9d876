//! SQLite implementation of the reminder ledger.
//!
//! `try_claim` is a single `INSERT OR IGNORE`; SQLite's statement atomicity
//! makes it the check-then-set the dispatcher's at-most-once guarantee
//! requires.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use roundtable_core::ReminderLedger;
use roundtable_domain::{ReminderKind, Result, UserId};
use rusqlite::params;
use uuid::Uuid;

use super::manager::DbManager;
use super::{map_join_error, map_sql_error};

pub struct SqliteReminderLedger {
    db: Arc<DbManager>,
}

impl SqliteReminderLedger {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReminderLedger for SqliteReminderLedger {
    async fn try_claim(
        &self,
        meeting_id: Uuid,
        user_id: UserId,
        kind: ReminderKind,
    ) -> Result<bool> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO reminder_ledger (id, meeting_id, user_id, kind, sent_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        Uuid::new_v4().to_string(),
                        meeting_id.to_string(),
                        user_id,
                        kind.to_string(),
                        Utc::now().timestamp(),
                    ],
                )
                .map_err(map_sql_error)?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn release(&self, meeting_id: Uuid, user_id: UserId, kind: ReminderKind) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                "DELETE FROM reminder_ledger WHERE meeting_id = ?1 AND user_id = ?2 AND kind = ?3",
                params![meeting_id.to_string(), user_id, kind.to_string()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn was_sent(
        &self,
        meeting_id: Uuid,
        user_id: UserId,
        kind: ReminderKind,
    ) -> Result<bool> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM reminder_ledger
                     WHERE meeting_id = ?1 AND user_id = ?2 AND kind = ?3",
                    params![meeting_id.to_string(), user_id, kind.to_string()],
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;
            Ok(count > 0)
        })
        .await
        .map_err(map_join_error)?
    }
}
