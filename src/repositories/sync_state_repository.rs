// src/repositories/sync_state_repository.rs
//
// Per-source last-run bookkeeping. The asymmetric write rules are the
// point: success rewrites run_at + summary and clears the error; failure
// rewrites only the error, preserving the last-known-good summary for
// status consumers.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::str::FromStr;
use std::sync::Arc;

use crate::db::ConnectionPool;
use crate::domain::{Provenance, SyncState};
use crate::error::AppResult;

pub trait SyncStateRepository: Send + Sync {
    fn record_success(
        &self,
        source: Provenance,
        run_at: DateTime<Utc>,
        summary_json: &str,
    ) -> AppResult<()>;
    fn record_failure(&self, source: Provenance, error: &str) -> AppResult<()>;
    fn get(&self, source: Provenance) -> AppResult<Option<SyncState>>;
    fn list_all(&self) -> AppResult<Vec<SyncState>>;
}

pub struct SqliteSyncStateRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteSyncStateRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_state(row: &Row) -> Result<SyncState, rusqlite::Error> {
        let source_str: String = row.get("source")?;
        let source = Provenance::from_str(&source_str)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let last_run_at_str: Option<String> = row.get("last_run_at")?;
        let last_run_at = last_run_at_str
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
            })
            .transpose()?;

        Ok(SyncState {
            source,
            last_run_at,
            last_summary: row.get("last_summary")?,
            last_error: row.get("last_error")?,
        })
    }
}

impl SyncStateRepository for SqliteSyncStateRepository {
    fn record_success(
        &self,
        source: Provenance,
        run_at: DateTime<Utc>,
        summary_json: &str,
    ) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO sync_state (source, last_run_at, last_summary, last_error)
             VALUES (?1, ?2, ?3, NULL)
             ON CONFLICT (source) DO UPDATE SET
                last_run_at = excluded.last_run_at,
                last_summary = excluded.last_summary,
                last_error = NULL",
            params![source.as_str(), run_at.to_rfc3339(), summary_json],
        )?;

        Ok(())
    }

    fn record_failure(&self, source: Provenance, error: &str) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO sync_state (source, last_error)
             VALUES (?1, ?2)
             ON CONFLICT (source) DO UPDATE SET
                last_error = excluded.last_error",
            params![source.as_str(), error],
        )?;

        Ok(())
    }

    fn get(&self, source: Provenance) -> AppResult<Option<SyncState>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT * FROM sync_state WHERE source = ?1")?;
        let mut rows = stmt.query_map(params![source.as_str()], Self::row_to_state)?;

        rows.next().transpose().map_err(Into::into)
    }

    fn list_all(&self) -> AppResult<Vec<SyncState>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT * FROM sync_state ORDER BY source")?;
        let rows = stmt.query_map([], Self::row_to_state)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, initialize_database};

    fn test_repo() -> SqliteSyncStateRepository {
        let pool = create_test_pool();
        initialize_database(&pool.get().unwrap()).unwrap();
        SqliteSyncStateRepository::new(Arc::new(pool))
    }

    #[test]
    fn test_success_then_failure_preserves_summary() {
        let repo = test_repo();
        let run_at = Utc::now();

        repo.record_success(Provenance::Anilist, run_at, r#"{"fetched":10}"#)
            .unwrap();
        repo.record_failure(Provenance::Anilist, "upstream timed out")
            .unwrap();

        let state = repo.get(Provenance::Anilist).unwrap().unwrap();
        assert_eq!(state.last_summary.as_deref(), Some(r#"{"fetched":10}"#));
        assert!(state.last_run_at.is_some());
        assert_eq!(state.last_error.as_deref(), Some("upstream timed out"));
    }

    #[test]
    fn test_success_clears_previous_error() {
        let repo = test_repo();

        repo.record_failure(Provenance::Anilist, "boom").unwrap();
        repo.record_success(Provenance::Anilist, Utc::now(), "{}")
            .unwrap();

        let state = repo.get(Provenance::Anilist).unwrap().unwrap();
        assert!(state.last_error.is_none());
        assert_eq!(state.last_summary.as_deref(), Some("{}"));
    }

    #[test]
    fn test_failure_before_any_success() {
        let repo = test_repo();

        repo.record_failure(Provenance::Anilist, "boom").unwrap();

        let state = repo.get(Provenance::Anilist).unwrap().unwrap();
        assert!(state.last_run_at.is_none());
        assert!(state.last_summary.is_none());
        assert_eq!(state.last_error.as_deref(), Some("boom"));
    }
}
