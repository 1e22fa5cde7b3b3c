// src/repositories/episode_repository.rs
//
// Episode persistence. The airing-window query is the dispatch engine's
// candidate feed; airs_at is stored as RFC 3339 UTC text, so lexicographic
// range comparison is chronological.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::{Episode, Provenance};
use crate::error::AppResult;

pub trait EpisodeRepository: Send + Sync {
    fn save(&self, episode: &Episode) -> AppResult<()>;
    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Episode>>;
    fn list_by_show(&self, show_id: Uuid) -> AppResult<Vec<Episode>>;
    /// Episodes with `from <= airs_at < until`, soonest first.
    fn list_airing_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Episode>>;
}

pub struct SqliteEpisodeRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteEpisodeRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

/// Map a database row to an Episode. All parse failures are explicit
/// errors, never silent defaults.
pub(crate) fn row_to_episode(row: &Row) -> Result<Episode, rusqlite::Error> {
    let id_str: String = row.get("id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let show_id_str: String = row.get("show_id")?;
    let show_id = Uuid::parse_str(&show_id_str)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let number: i64 = row.get("number")?;

    let airs_at_str: String = row.get("airs_at")?;
    let airs_at = DateTime::parse_from_rfc3339(&airs_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let provenance_str: String = row.get("provenance")?;
    let provenance = Provenance::from_str(&provenance_str)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let created_at_str: String = row.get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    let updated_at_str: String = row.get("updated_at")?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    Ok(Episode {
        id,
        show_id,
        number: number as u32,
        title: row.get("title")?,
        airs_at,
        provenance,
        external_id: row.get("external_id")?,
        created_at,
        updated_at,
    })
}

impl EpisodeRepository for SqliteEpisodeRepository {
    fn save(&self, episode: &Episode) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO episodes (
                id, show_id, number, title, airs_at,
                provenance, external_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (id) DO UPDATE SET
                show_id = excluded.show_id,
                number = excluded.number,
                title = excluded.title,
                airs_at = excluded.airs_at,
                updated_at = excluded.updated_at",
            params![
                episode.id.to_string(),
                episode.show_id.to_string(),
                episode.number as i64,
                episode.title,
                episode.airs_at.to_rfc3339(),
                episode.provenance.as_str(),
                episode.external_id,
                episode.created_at.to_rfc3339(),
                episode.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Episode>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT * FROM episodes WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id.to_string()], row_to_episode)?;

        rows.next().transpose().map_err(Into::into)
    }

    fn list_by_show(&self, show_id: Uuid) -> AppResult<Vec<Episode>> {
        let conn = self.pool.get()?;

        let mut stmt =
            conn.prepare("SELECT * FROM episodes WHERE show_id = ?1 ORDER BY number")?;
        let rows = stmt.query_map(params![show_id.to_string()], row_to_episode)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn list_airing_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<Episode>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT * FROM episodes WHERE airs_at >= ?1 AND airs_at < ?2 ORDER BY airs_at",
        )?;
        let rows = stmt.query_map(
            params![from.to_rfc3339(), until.to_rfc3339()],
            row_to_episode,
        )?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
