// src/services/sync_service.rs
//
// Reconciliation engine: fetch upcoming airings from the upstream source,
// normalize them at the boundary, and merge them into the catalog in one
// atomic batch. Re-running against identical upstream data is a no-op
// besides refreshed sync state.
//
// Run boundary rules:
// - fetch-all-then-apply: a page failure aborts before any write
// - success records run timestamp + JSON summary, clears the last error
// - upstream failure records only the error; the last-good summary stays

use chrono::{DateTime, Duration, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use crate::config::SyncConfig;
use crate::domain::{Provenance, SyncState};
use crate::error::AppResult;
use crate::events::{EventBus, SyncRunCompleted, SyncRunFailed};
use crate::integrations::{AiringItem, AiringScheduleSource, AiringWindow};
use crate::repositories::{CatalogRepository, SyncItem, SyncStateRepository};

/// Machine-readable run summary. The JSON form is what sync_state stores
/// as last_summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub shows_upserted: usize,
    pub episodes_upserted: usize,
    pub skipped: usize,
    pub completed_at: DateTime<Utc>,
}

pub struct SyncService {
    upstream: Arc<dyn AiringScheduleSource>,
    catalog: Arc<dyn CatalogRepository>,
    sync_state: Arc<dyn SyncStateRepository>,
    event_bus: Arc<EventBus>,
    config: SyncConfig,
    /// Serializes overlapping runs (timer tick vs. manual trigger)
    run_lock: tokio::sync::Mutex<()>,
}

impl SyncService {
    pub fn new(
        upstream: Arc<dyn AiringScheduleSource>,
        catalog: Arc<dyn CatalogRepository>,
        sync_state: Arc<dyn SyncStateRepository>,
        event_bus: Arc<EventBus>,
        config: SyncConfig,
    ) -> Self {
        Self {
            upstream,
            catalog,
            sync_state,
            event_bus,
            config,
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one reconciliation. Concurrent invocations serialize; each
    /// run's writes land atomically or not at all.
    pub async fn sync(&self) -> AppResult<SyncReport> {
        let _guard = self.run_lock.lock().await;
        let source = self.upstream.source();

        match self.run(source).await {
            Ok(report) => {
                let summary = serde_json::to_string(&report)?;
                self.sync_state
                    .record_success(source, report.completed_at, &summary)?;
                self.event_bus.emit(SyncRunCompleted::new(
                    source.to_string(),
                    report.fetched,
                    report.shows_upserted,
                    report.episodes_upserted,
                    report.skipped,
                ));
                Ok(report)
            }
            Err(e) => {
                if e.is_upstream() {
                    self.sync_state.record_failure(source, &e.to_string())?;
                }
                self.event_bus
                    .emit(SyncRunFailed::new(source.to_string(), e.to_string()));
                Err(e)
            }
        }
    }

    /// Last-run state per source, for status display.
    pub fn status(&self) -> AppResult<Vec<SyncState>> {
        self.sync_state.list_all()
    }

    async fn run(&self, source: Provenance) -> AppResult<SyncReport> {
        let now = Utc::now();
        let window = AiringWindow {
            from: now,
            until: now + Duration::days(self.config.horizon_days as i64),
        };

        let mut raw = Vec::new();
        for page in 1..=self.config.page_cap {
            let fetched = self.upstream.fetch_page(page, &window).await?;
            raw.extend(fetched.items);
            if !fetched.has_next {
                break;
            }
        }

        let fetched = raw.len();
        let (items, skipped) = normalize_items(raw);
        let outcome = self.catalog.apply_batch(source, &items)?;

        tracing::info!(
            source = %source,
            fetched,
            shows = outcome.shows_upserted(),
            episodes = outcome.episodes_upserted(),
            skipped,
            "reconciliation batch applied"
        );

        Ok(SyncReport {
            fetched,
            shows_upserted: outcome.shows_upserted(),
            episodes_upserted: outcome.episodes_upserted(),
            skipped,
            completed_at: Utc::now(),
        })
    }
}

/// Per-item boundary validation. Items without a usable airing time,
/// ordinal, or title are dropped individually; duplicated events and
/// (show, ordinal) slots within one run keep the first occurrence.
fn normalize_items(raw: Vec<AiringItem>) -> (Vec<SyncItem>, usize) {
    let mut items = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    let mut seen_events: HashSet<String> = HashSet::new();
    let mut seen_slots: HashSet<(String, u32)> = HashSet::new();

    for item in raw {
        let number = match u32::try_from(item.episode_number) {
            Ok(n) if n >= 1 => n,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let airs_at = match Utc.timestamp_opt(item.airing_at, 0).single() {
            Some(t) if item.airing_at > 0 => t,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let title = match item.show_title.as_deref().map(clean_text) {
            Some(t) if !t.is_empty() => t,
            _ => {
                skipped += 1;
                continue;
            }
        };

        if !seen_events.insert(item.episode_external_id.clone())
            || !seen_slots.insert((item.show_external_id.clone(), number))
        {
            skipped += 1;
            continue;
        }

        items.push(SyncItem {
            show_external_id: item.show_external_id,
            show_title: title,
            show_cover_url: item.show_cover_url,
            show_synopsis: item
                .show_synopsis
                .as_deref()
                .map(clean_text)
                .filter(|s| !s.is_empty()),
            show_episode_count: item.show_episode_count,
            episode_external_id: item.episode_external_id,
            episode_number: number,
            episode_title: None,
            airs_at,
        });
    }

    (items, skipped)
}

fn break_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"))
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Strip markup and decode the basic HTML entities AniList rich text
/// carries. `&amp;` decodes last so entity text is never double-decoded.
fn clean_text(input: &str) -> String {
    let with_breaks = break_tag_regex().replace_all(input, "\n");
    let stripped = markup_regex().replace_all(&with_breaks, "");

    stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_item(show_ext: &str, ep_ext: &str, number: i64, airing_at: i64) -> AiringItem {
        AiringItem {
            show_external_id: show_ext.to_string(),
            show_title: Some(format!("Show {}", show_ext)),
            show_cover_url: None,
            show_synopsis: None,
            show_episode_count: None,
            episode_external_id: ep_ext.to_string(),
            episode_number: number,
            airing_at,
        }
    }

    #[test]
    fn test_clean_text_strips_markup_and_entities() {
        let input = "An elf &amp; her party.<br><i>Spoilers &lt;ahead&gt;.</i>";
        assert_eq!(clean_text(input), "An elf & her party.\nSpoilers <ahead>.");
    }

    #[test]
    fn test_clean_text_does_not_double_decode() {
        assert_eq!(clean_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_normalize_skips_unusable_items() {
        let raw = vec![
            raw_item("1", "10", 1, 1_704_902_400),
            raw_item("1", "11", 0, 1_704_902_400),  // bad ordinal
            raw_item("1", "12", 2, 0),              // no airing time
            raw_item("1", "13", -3, 1_704_902_400), // negative ordinal
        ];

        let (items, skipped) = normalize_items(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(skipped, 3);
    }

    #[test]
    fn test_normalize_skips_untitled_shows() {
        let mut item = raw_item("1", "10", 1, 1_704_902_400);
        item.show_title = Some("<i></i>".to_string());
        let (items, skipped) = normalize_items(vec![item]);
        assert!(items.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_normalize_dedupes_within_one_run() {
        let raw = vec![
            raw_item("1", "10", 1, 1_704_902_400),
            raw_item("1", "10", 1, 1_704_902_400), // repeated event id
            raw_item("1", "99", 1, 1_704_988_800), // same (show, ordinal) slot
        ];

        let (items, skipped) = normalize_items(raw);
        assert_eq!(items.len(), 1);
        assert_eq!(skipped, 2);
        assert_eq!(items[0].episode_external_id, "10");
    }
}
