// src/repositories/notification_repository.rs
//
// Notification ledger persistence. Rows are written once, after a
// successful delivery, and never updated or deleted; the primary key on
// (reminder, episode, channel) makes a second write fail loudly.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::{Channel, NotificationAttempt};
use crate::error::AppResult;

pub trait NotificationRepository: Send + Sync {
    fn record(&self, attempt: &NotificationAttempt) -> AppResult<()>;
    fn exists(&self, reminder_id: Uuid, episode_id: Uuid, channel: Channel) -> AppResult<bool>;
    fn list_for_reminder(&self, reminder_id: Uuid) -> AppResult<Vec<NotificationAttempt>>;
    fn count(&self) -> AppResult<usize>;
}

pub struct SqliteNotificationRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteNotificationRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_attempt(row: &Row) -> Result<NotificationAttempt, rusqlite::Error> {
        let reminder_id_str: String = row.get("reminder_id")?;
        let reminder_id = Uuid::parse_str(&reminder_id_str)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let episode_id_str: String = row.get("episode_id")?;
        let episode_id = Uuid::parse_str(&episode_id_str)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let channel_str: String = row.get("channel")?;
        let channel = Channel::from_str(&channel_str)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let sent_at_str: String = row.get("sent_at")?;
        let sent_at = DateTime::parse_from_rfc3339(&sent_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok(NotificationAttempt {
            reminder_id,
            episode_id,
            channel,
            sent_at,
        })
    }
}

impl NotificationRepository for SqliteNotificationRepository {
    fn record(&self, attempt: &NotificationAttempt) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO notifications (reminder_id, episode_id, channel, sent_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                attempt.reminder_id.to_string(),
                attempt.episode_id.to_string(),
                attempt.channel.as_str(),
                attempt.sent_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn exists(&self, reminder_id: Uuid, episode_id: Uuid, channel: Channel) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM notifications
                WHERE reminder_id = ?1 AND episode_id = ?2 AND channel = ?3
            )",
            params![
                reminder_id.to_string(),
                episode_id.to_string(),
                channel.as_str()
            ],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn list_for_reminder(&self, reminder_id: Uuid) -> AppResult<Vec<NotificationAttempt>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT * FROM notifications WHERE reminder_id = ?1 ORDER BY sent_at",
        )?;
        let rows = stmt.query_map(params![reminder_id.to_string()], Self::row_to_attempt)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn count(&self) -> AppResult<usize> {
        let conn = self.pool.get()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notifications", [], |row| {
            row.get(0)
        })?;

        Ok(count as usize)
    }
}
