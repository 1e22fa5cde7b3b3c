// src/repositories/reminder_repository.rs
//
// Reminder persistence. The EmailTarget enum maps onto the
// (email_kind, email_address) column pair: kind 'account' carries no
// address, kind 'address' always does.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::{EmailTarget, Reminder};
use crate::error::{AppError, AppResult};

pub trait ReminderRepository: Send + Sync {
    fn save(&self, reminder: &Reminder) -> AppResult<()>;
    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Reminder>>;
    fn list_by_owner(&self, owner: &str) -> AppResult<Vec<Reminder>>;
    fn list_active(&self) -> AppResult<Vec<Reminder>>;
    fn set_active(&self, id: Uuid, active: bool) -> AppResult<()>;
    fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct SqliteReminderRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteReminderRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_reminder(row: &Row) -> Result<Reminder, rusqlite::Error> {
        let id_str: String = row.get("id")?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let show_id_str: Option<String> = row.get("show_id")?;
        let show_id = show_id_str
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
            })
            .transpose()?;

        let email_kind: Option<String> = row.get("email_kind")?;
        let email_address: Option<String> = row.get("email_address")?;
        let email = match email_kind.as_deref() {
            None => None,
            Some("account") => Some(EmailTarget::Account),
            Some("address") => {
                let address = email_address.ok_or(rusqlite::Error::InvalidQuery)?;
                Some(EmailTarget::Address(address))
            }
            Some(_) => return Err(rusqlite::Error::InvalidQuery),
        };

        let lead_minutes: i64 = row.get("lead_minutes")?;
        let active: i64 = row.get("active")?;

        let created_at_str: String = row.get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok(Reminder {
            id,
            owner: row.get("owner")?,
            show_id,
            email,
            webhook_url: row.get("webhook_url")?,
            lead_minutes: lead_minutes as u32,
            active: active != 0,
            created_at,
        })
    }
}

impl ReminderRepository for SqliteReminderRepository {
    fn save(&self, reminder: &Reminder) -> AppResult<()> {
        let conn = self.pool.get()?;

        let (email_kind, email_address) = match &reminder.email {
            None => (None, None),
            Some(EmailTarget::Account) => (Some("account"), None),
            Some(EmailTarget::Address(address)) => (Some("address"), Some(address.as_str())),
        };

        conn.execute(
            "INSERT INTO reminders (
                id, owner, show_id, email_kind, email_address,
                webhook_url, lead_minutes, active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                reminder.id.to_string(),
                reminder.owner,
                reminder.show_id.map(|id| id.to_string()),
                email_kind,
                email_address,
                reminder.webhook_url,
                reminder.lead_minutes as i64,
                reminder.active as i64,
                reminder.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Reminder>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT * FROM reminders WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_reminder)?;

        rows.next().transpose().map_err(Into::into)
    }

    fn list_by_owner(&self, owner: &str) -> AppResult<Vec<Reminder>> {
        let conn = self.pool.get()?;

        let mut stmt =
            conn.prepare("SELECT * FROM reminders WHERE owner = ?1 ORDER BY created_at")?;
        let rows = stmt.query_map(params![owner], Self::row_to_reminder)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn list_active(&self) -> AppResult<Vec<Reminder>> {
        let conn = self.pool.get()?;

        let mut stmt =
            conn.prepare("SELECT * FROM reminders WHERE active = 1 ORDER BY created_at")?;
        let rows = stmt.query_map([], Self::row_to_reminder)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn set_active(&self, id: Uuid, active: bool) -> AppResult<()> {
        let conn = self.pool.get()?;

        let changed = conn.execute(
            "UPDATE reminders SET active = ?1 WHERE id = ?2",
            params![active as i64, id.to_string()],
        )?;

        if changed == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    fn delete(&self, id: Uuid) -> AppResult<()> {
        let conn = self.pool.get()?;

        let changed = conn.execute(
            "DELETE FROM reminders WHERE id = ?1",
            params![id.to_string()],
        )?;

        if changed == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
