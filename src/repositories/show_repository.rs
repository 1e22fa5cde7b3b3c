// src/repositories/show_repository.rs
//
// Show persistence. Dumb data mapper: no invariant enforcement, no events.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::{Provenance, Show};
use crate::error::AppResult;

pub trait ShowRepository: Send + Sync {
    fn save(&self, show: &Show) -> AppResult<()>;
    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Show>>;
    fn find_by_external_id(
        &self,
        provenance: Provenance,
        external_id: &str,
    ) -> AppResult<Option<Show>>;
    fn list_all(&self) -> AppResult<Vec<Show>>;
    fn exists(&self, id: Uuid) -> AppResult<bool>;
}

pub struct SqliteShowRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteShowRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

/// Map a database row to a Show - returns rusqlite::Error for query_map
/// compatibility. All parse failures are explicit errors, never defaults.
pub(crate) fn row_to_show(row: &Row) -> Result<Show, rusqlite::Error> {
    let id_str: String = row.get("id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let provenance_str: String = row.get("provenance")?;
    let provenance = Provenance::from_str(&provenance_str)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let episode_count: Option<i64> = row.get("episode_count")?;

    let created_at_str: String = row.get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let updated_at_str: String = row.get("updated_at")?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    Ok(Show {
        id,
        title: row.get("title")?,
        cover_url: row.get("cover_url")?,
        synopsis: row.get("synopsis")?,
        episode_count: episode_count.map(|v| v as u32),
        provenance,
        external_id: row.get("external_id")?,
        created_at,
        updated_at,
    })
}

impl ShowRepository for SqliteShowRepository {
    fn save(&self, show: &Show) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO shows (
                id, title, cover_url, synopsis, episode_count,
                provenance, external_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                cover_url = excluded.cover_url,
                synopsis = excluded.synopsis,
                episode_count = excluded.episode_count,
                updated_at = excluded.updated_at",
            params![
                show.id.to_string(),
                show.title,
                show.cover_url,
                show.synopsis,
                show.episode_count.map(|v| v as i64),
                show.provenance.as_str(),
                show.external_id,
                show.created_at.to_rfc3339(),
                show.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Show>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT * FROM shows WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id.to_string()], row_to_show)?;

        rows.next().transpose().map_err(Into::into)
    }

    fn find_by_external_id(
        &self,
        provenance: Provenance,
        external_id: &str,
    ) -> AppResult<Option<Show>> {
        let conn = self.pool.get()?;

        let mut stmt =
            conn.prepare("SELECT * FROM shows WHERE provenance = ?1 AND external_id = ?2")?;
        let mut rows = stmt.query_map(params![provenance.as_str(), external_id], row_to_show)?;

        rows.next().transpose().map_err(Into::into)
    }

    fn list_all(&self) -> AppResult<Vec<Show>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT * FROM shows ORDER BY title")?;
        let rows = stmt.query_map([], row_to_show)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn exists(&self, id: Uuid) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM shows WHERE id = ?1)",
            params![id.to_string()],
            |row| row.get(0),
        )?;

        Ok(exists)
    }
}
