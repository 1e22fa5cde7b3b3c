// src/repositories/catalog_repository.rs
//
// Atomic application of one reconciliation batch. All upserts for a run
// execute inside a single SQLite transaction: either every write lands or
// none do, so concurrent readers never observe a half-applied run.
//
// Upserts are explicit lookup-then-insert/update, keyed on
// (provenance, external_id). INSERT OR REPLACE is deliberately not used:
// it would re-key surrogate ids and cascade-delete dependent rows.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::Provenance;
use crate::error::AppResult;

/// One normalized upstream item, ready to merge. Produced by the sync
/// service after boundary validation and markup stripping.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncItem {
    pub show_external_id: String,
    pub show_title: String,
    pub show_cover_url: Option<String>,
    pub show_synopsis: Option<String>,
    pub show_episode_count: Option<u32>,
    pub episode_external_id: String,
    pub episode_number: u32,
    pub episode_title: Option<String>,
    pub airs_at: DateTime<Utc>,
}

/// Net effect of one applied batch. "Unchanged" rows perform no write at
/// all, so a byte-identical re-run reports zero inserts and zero updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub shows_inserted: usize,
    pub shows_updated: usize,
    pub episodes_inserted: usize,
    pub episodes_updated: usize,
}

impl BatchOutcome {
    pub fn shows_upserted(&self) -> usize {
        self.shows_inserted + self.shows_updated
    }

    pub fn episodes_upserted(&self) -> usize {
        self.episodes_inserted + self.episodes_updated
    }
}

pub trait CatalogRepository: Send + Sync {
    fn apply_batch(&self, source: Provenance, items: &[SyncItem]) -> AppResult<BatchOutcome>;
}

pub struct SqliteCatalogRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteCatalogRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Upsert the show by (source, external id) and return its current
    /// local id. On conflict only display fields refresh; the surrogate
    /// id never changes.
    fn upsert_show(
        tx: &Transaction,
        source: Provenance,
        item: &SyncItem,
        now: DateTime<Utc>,
        outcome: &mut BatchOutcome,
    ) -> AppResult<Uuid> {
        let existing: Option<(String, String, Option<String>, Option<String>, Option<i64>)> = tx
            .query_row(
                "SELECT id, title, cover_url, synopsis, episode_count
                 FROM shows WHERE provenance = ?1 AND external_id = ?2",
                params![source.as_str(), item.show_external_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        match existing {
            Some((id_str, title, cover_url, synopsis, episode_count)) => {
                let id = Uuid::parse_str(&id_str).map_err(crate::error::AppError::from)?;

                let unchanged = title == item.show_title
                    && cover_url == item.show_cover_url
                    && synopsis == item.show_synopsis
                    && episode_count == item.show_episode_count.map(|v| v as i64);

                if !unchanged {
                    tx.execute(
                        "UPDATE shows SET title = ?1, cover_url = ?2, synopsis = ?3,
                                episode_count = ?4, updated_at = ?5 WHERE id = ?6",
                        params![
                            item.show_title,
                            item.show_cover_url,
                            item.show_synopsis,
                            item.show_episode_count.map(|v| v as i64),
                            now.to_rfc3339(),
                            id_str,
                        ],
                    )?;
                    outcome.shows_updated += 1;
                }

                Ok(id)
            }
            None => {
                let id = Uuid::new_v4();
                tx.execute(
                    "INSERT INTO shows (
                        id, title, cover_url, synopsis, episode_count,
                        provenance, external_id, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                    params![
                        id.to_string(),
                        item.show_title,
                        item.show_cover_url,
                        item.show_synopsis,
                        item.show_episode_count.map(|v| v as i64),
                        source.as_str(),
                        item.show_external_id,
                        now.to_rfc3339(),
                    ],
                )?;
                outcome.shows_inserted += 1;
                Ok(id)
            }
        }
    }

    /// Upsert the episode. Lookup order:
    /// 1. by (source, external id) - refresh ordinal/title/airing time and
    ///    re-point the owning show (upstream re-keying);
    /// 2. by (show, ordinal, source) - an existing slot adopts the new
    ///    external id, preserving ledger history across upstream re-keys;
    /// 3. otherwise insert.
    fn upsert_episode(
        tx: &Transaction,
        source: Provenance,
        item: &SyncItem,
        show_id: Uuid,
        now: DateTime<Utc>,
        outcome: &mut BatchOutcome,
    ) -> AppResult<()> {
        let by_external: Option<(String, String, i64, Option<String>, String)> = tx
            .query_row(
                "SELECT id, show_id, number, title, airs_at
                 FROM episodes WHERE provenance = ?1 AND external_id = ?2",
                params![source.as_str(), item.episode_external_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        if let Some((id_str, ep_show_id, number, title, airs_at)) = by_external {
            let unchanged = ep_show_id == show_id.to_string()
                && number == item.episode_number as i64
                && title == item.episode_title
                && airs_at == item.airs_at.to_rfc3339();

            if !unchanged {
                tx.execute(
                    "UPDATE episodes SET show_id = ?1, number = ?2, title = ?3,
                            airs_at = ?4, updated_at = ?5 WHERE id = ?6",
                    params![
                        show_id.to_string(),
                        item.episode_number as i64,
                        item.episode_title,
                        item.airs_at.to_rfc3339(),
                        now.to_rfc3339(),
                        id_str,
                    ],
                )?;
                outcome.episodes_updated += 1;
            }
            return Ok(());
        }

        let by_slot: Option<String> = tx
            .query_row(
                "SELECT id FROM episodes
                 WHERE show_id = ?1 AND number = ?2 AND provenance = ?3",
                params![
                    show_id.to_string(),
                    item.episode_number as i64,
                    source.as_str()
                ],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id_str) = by_slot {
            tx.execute(
                "UPDATE episodes SET title = ?1, airs_at = ?2, external_id = ?3,
                        updated_at = ?4 WHERE id = ?5",
                params![
                    item.episode_title,
                    item.airs_at.to_rfc3339(),
                    item.episode_external_id,
                    now.to_rfc3339(),
                    id_str,
                ],
            )?;
            outcome.episodes_updated += 1;
            return Ok(());
        }

        tx.execute(
            "INSERT INTO episodes (
                id, show_id, number, title, airs_at,
                provenance, external_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                Uuid::new_v4().to_string(),
                show_id.to_string(),
                item.episode_number as i64,
                item.episode_title,
                item.airs_at.to_rfc3339(),
                source.as_str(),
                item.episode_external_id,
                now.to_rfc3339(),
            ],
        )?;
        outcome.episodes_inserted += 1;

        Ok(())
    }
}

impl CatalogRepository for SqliteCatalogRepository {
    fn apply_batch(&self, source: Provenance, items: &[SyncItem]) -> AppResult<BatchOutcome> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let now = Utc::now();
        let mut outcome = BatchOutcome::default();

        for item in items {
            let show_id = Self::upsert_show(&tx, source, item, now, &mut outcome)?;
            Self::upsert_episode(&tx, source, item, show_id, now, &mut outcome)?;
        }

        tx.commit()?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, initialize_database};
    use crate::repositories::episode_repository::{EpisodeRepository, SqliteEpisodeRepository};
    use crate::repositories::show_repository::{ShowRepository, SqliteShowRepository};
    use chrono::TimeZone;

    fn setup() -> (
        SqliteCatalogRepository,
        SqliteShowRepository,
        SqliteEpisodeRepository,
    ) {
        let pool = Arc::new(create_test_pool());
        initialize_database(&pool.get().unwrap()).unwrap();
        (
            SqliteCatalogRepository::new(pool.clone()),
            SqliteShowRepository::new(pool.clone()),
            SqliteEpisodeRepository::new(pool),
        )
    }

    fn item(show_ext: &str, ep_ext: &str, number: u32) -> SyncItem {
        SyncItem {
            show_external_id: show_ext.to_string(),
            show_title: format!("Show {}", show_ext),
            show_cover_url: None,
            show_synopsis: Some("A quiet journey.".to_string()),
            show_episode_count: Some(12),
            episode_external_id: ep_ext.to_string(),
            episode_number: number,
            episode_title: None,
            airs_at: Utc.with_ymd_and_hms(2024, 1, 10, 16, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_fresh_batch_inserts_everything() {
        let (catalog, shows, episodes) = setup();

        let items = vec![item("100", "1000", 1), item("100", "1001", 2)];
        let outcome = catalog.apply_batch(Provenance::Anilist, &items).unwrap();

        assert_eq!(outcome.shows_inserted, 1);
        assert_eq!(outcome.episodes_inserted, 2);
        assert_eq!(outcome.shows_updated, 0);

        let show = shows
            .find_by_external_id(Provenance::Anilist, "100")
            .unwrap()
            .unwrap();
        assert_eq!(episodes.list_by_show(show.id).unwrap().len(), 2);
    }

    #[test]
    fn test_identical_rerun_is_a_no_op() {
        let (catalog, shows, _) = setup();

        let items = vec![item("100", "1000", 1), item("100", "1001", 2)];
        catalog.apply_batch(Provenance::Anilist, &items).unwrap();

        let before = shows
            .find_by_external_id(Provenance::Anilist, "100")
            .unwrap()
            .unwrap();

        let outcome = catalog.apply_batch(Provenance::Anilist, &items).unwrap();
        assert_eq!(outcome, BatchOutcome::default());

        let after = shows
            .find_by_external_id(Provenance::Anilist, "100")
            .unwrap()
            .unwrap();
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[test]
    fn test_display_refresh_keeps_identity() {
        let (catalog, shows, _) = setup();

        catalog
            .apply_batch(Provenance::Anilist, &[item("100", "1000", 1)])
            .unwrap();
        let original = shows
            .find_by_external_id(Provenance::Anilist, "100")
            .unwrap()
            .unwrap();

        let mut changed = item("100", "1000", 1);
        changed.show_title = "Renamed upstream".to_string();
        let outcome = catalog
            .apply_batch(Provenance::Anilist, &[changed])
            .unwrap();

        assert_eq!(outcome.shows_updated, 1);
        let refreshed = shows
            .find_by_external_id(Provenance::Anilist, "100")
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.id, original.id);
        assert_eq!(refreshed.title, "Renamed upstream");
    }

    #[test]
    fn test_rekeyed_episode_moves_without_duplicating() {
        let (catalog, shows, episodes) = setup();

        catalog
            .apply_batch(Provenance::Anilist, &[item("100", "1000", 1)])
            .unwrap();

        // Upstream re-associates event 1000 with show 200
        let mut moved = item("200", "1000", 1);
        moved.show_title = "Show 200".to_string();
        catalog.apply_batch(Provenance::Anilist, &[moved]).unwrap();

        let show_a = shows
            .find_by_external_id(Provenance::Anilist, "100")
            .unwrap()
            .unwrap();
        let show_b = shows
            .find_by_external_id(Provenance::Anilist, "200")
            .unwrap()
            .unwrap();

        assert_eq!(episodes.list_by_show(show_a.id).unwrap().len(), 0);
        let moved_rows = episodes.list_by_show(show_b.id).unwrap();
        assert_eq!(moved_rows.len(), 1);
        assert_eq!(moved_rows[0].external_id.as_deref(), Some("1000"));
    }

    #[test]
    fn test_slot_adopts_new_external_id() {
        let (catalog, shows, episodes) = setup();

        catalog
            .apply_batch(Provenance::Anilist, &[item("100", "1000", 1)])
            .unwrap();
        let show = shows
            .find_by_external_id(Provenance::Anilist, "100")
            .unwrap()
            .unwrap();
        let original = &episodes.list_by_show(show.id).unwrap()[0];
        let original_id = original.id;

        // Same (show, ordinal) slot arrives under a fresh upstream id
        catalog
            .apply_batch(Provenance::Anilist, &[item("100", "2000", 1)])
            .unwrap();

        let rows = episodes.list_by_show(show.id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, original_id);
        assert_eq!(rows[0].external_id.as_deref(), Some("2000"));
    }

    #[test]
    fn test_failed_batch_leaves_no_partial_state() {
        let (catalog, shows, _) = setup();

        catalog
            .apply_batch(
                Provenance::Anilist,
                &[item("100", "1000", 1), item("100", "1001", 2)],
            )
            .unwrap();

        // Second item re-keys episode 1001 onto the slot episode 1000
        // already occupies, which violates UNIQUE(show_id, number) and
        // aborts the batch. The first item's new show must not survive.
        let mut colliding = item("100", "1001", 1);
        colliding.show_title = "Show 100".to_string();
        let batch = vec![item("300", "3000", 1), colliding];

        assert!(catalog.apply_batch(Provenance::Anilist, &batch).is_err());
        assert!(shows
            .find_by_external_id(Provenance::Anilist, "300")
            .unwrap()
            .is_none());
    }
}
