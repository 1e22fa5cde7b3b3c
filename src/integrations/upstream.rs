// src/integrations/upstream.rs
//
// Upstream airing-schedule seam. The sync service depends on this trait
// only; the AniList client is the production implementation, tests script
// their own pages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Provenance;
use crate::error::AppResult;

/// Time window a fetch covers, both ends UTC.
#[derive(Debug, Clone, Copy)]
pub struct AiringWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// One raw upstream item. Fields arrive as the source sent them;
/// validation and markup stripping happen in the sync service, which
/// rejects unusable items individually instead of failing the page.
#[derive(Debug, Clone)]
pub struct AiringItem {
    pub show_external_id: String,
    pub show_title: Option<String>,
    pub show_cover_url: Option<String>,
    pub show_synopsis: Option<String>,
    pub show_episode_count: Option<u32>,
    pub episode_external_id: String,
    /// Raw ordinal; non-positive values are skipped during normalization
    pub episode_number: i64,
    /// Raw epoch seconds; non-positive values are skipped during normalization
    pub airing_at: i64,
}

/// One page of upstream results.
#[derive(Debug, Clone)]
pub struct SchedulePage {
    pub items: Vec<AiringItem>,
    pub has_next: bool,
}

/// A paginated source of upcoming airing events.
///
/// Failures surface as `AppError::UpstreamUnavailable` (network, timeout,
/// server errors) or `AppError::UpstreamProtocol` (malformed responses).
#[async_trait]
pub trait AiringScheduleSource: Send + Sync {
    /// Provenance tag written on every row merged from this source
    fn source(&self) -> Provenance;

    /// Fetch one page (1-based) of events airing inside `window`
    async fn fetch_page(&self, page: u32, window: &AiringWindow) -> AppResult<SchedulePage>;
}
