// src/integrations/anilist/client.rs
//
// AniList API Integration
//
// ARCHITECTURE:
// - GraphQL client for the AniList airing schedule
// - Handles rate limiting, pagination, bounded timeouts
// - Maps external data → AiringItem records (NO domain mutation)
// - Used by SyncService through the AiringScheduleSource trait
//
// CRITICAL RULES:
// - This is INFRASTRUCTURE, not DOMAIN
// - Never creates or modifies domain entities directly
// - Handles all external API concerns

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::domain::Provenance;
use crate::error::{AppError, AppResult};
use crate::integrations::upstream::{AiringItem, AiringScheduleSource, AiringWindow, SchedulePage};

const ANILIST_URL: &str = "https://graphql.anilist.co";
const PER_PAGE: u32 = 50;

/// GraphQL response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ScheduleData {
    #[serde(rename = "Page")]
    page: PageData,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "pageInfo")]
    page_info: PageInfoData,
    #[serde(rename = "airingSchedules")]
    airing_schedules: Vec<AiringScheduleData>,
}

#[derive(Debug, Deserialize)]
struct PageInfoData {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct AiringScheduleData {
    id: i64,
    episode: i64,
    #[serde(rename = "airingAt")]
    airing_at: i64,
    media: MediaData,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    id: i64,
    title: TitleData,
    #[serde(rename = "coverImage")]
    cover_image: Option<CoverImageData>,
    description: Option<String>,
    episodes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TitleData {
    romaji: Option<String>,
    english: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoverImageData {
    large: Option<String>,
}

/// Rate limiter state. AniList allows ~90 requests/minute; one per second
/// stays comfortably inside that.
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new() -> Self {
        Self {
            last_request: Instant::now() - Duration::from_secs(60),
            min_interval: Duration::from_millis(1000),
        }
    }

    /// Claim the next request slot, returning how long to sleep first.
    fn reserve(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let ready_at = self.last_request + self.min_interval;
        if now < ready_at {
            let wait = ready_at - now;
            self.last_request = ready_at;
            Some(wait)
        } else {
            self.last_request = now;
            None
        }
    }
}

/// AniList API client
pub struct AniListClient {
    base_url: String,
    http_client: Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl AniListClient {
    /// Create a client with a bounded request timeout. A hung upstream
    /// must never stall the sync task indefinitely.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: ANILIST_URL.to_string(),
            http_client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
        })
    }

    async fn throttle(&self) {
        let wait = {
            let mut limiter = self.rate_limiter.lock().unwrap();
            limiter.reserve()
        };
        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }
    }

    fn map_schedule(entry: AiringScheduleData) -> AiringItem {
        let media = entry.media;
        let title = media.title.romaji.or(media.title.english);

        AiringItem {
            show_external_id: media.id.to_string(),
            show_title: title,
            show_cover_url: media.cover_image.and_then(|c| c.large),
            show_synopsis: media.description,
            show_episode_count: media.episodes.and_then(|n| u32::try_from(n).ok()),
            episode_external_id: entry.id.to_string(),
            episode_number: entry.episode,
            airing_at: entry.airing_at,
        }
    }

    /// Execute a GraphQL query, mapping transport failures to
    /// UpstreamUnavailable and malformed payloads to UpstreamProtocol.
    async fn execute_query<T>(&self, query: &str, variables: serde_json::Value) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let body = json!({
            "query": query,
            "variables": variables
        });

        let response = self
            .http_client
            .post(&self.base_url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("AniList request: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::UpstreamUnavailable(format!(
                "AniList returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(AppError::UpstreamProtocol(format!(
                "AniList returned {}",
                status
            )));
        }

        let parsed: GraphQLResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamProtocol(format!("AniList response body: {}", e)))?;

        if let Some(errors) = parsed.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(AppError::UpstreamProtocol(format!(
                "AniList GraphQL errors: {}",
                messages.join("; ")
            )));
        }

        parsed
            .data
            .ok_or_else(|| AppError::UpstreamProtocol("AniList response missing data".to_string()))
    }
}

#[async_trait]
impl AiringScheduleSource for AniListClient {
    fn source(&self) -> Provenance {
        Provenance::Anilist
    }

    async fn fetch_page(&self, page: u32, window: &AiringWindow) -> AppResult<SchedulePage> {
        self.throttle().await;

        let graphql_query = r#"
            query ($page: Int, $perPage: Int, $from: Int, $to: Int) {
                Page(page: $page, perPage: $perPage) {
                    pageInfo {
                        hasNextPage
                    }
                    airingSchedules(airingAt_greater: $from, airingAt_lesser: $to, sort: TIME) {
                        id
                        episode
                        airingAt
                        media {
                            id
                            title {
                                romaji
                                english
                            }
                            coverImage {
                                large
                            }
                            description
                            episodes
                        }
                    }
                }
            }
        "#;

        let variables = json!({
            "page": page,
            "perPage": PER_PAGE,
            "from": window.from.timestamp(),
            "to": window.until.timestamp(),
        });

        let data: ScheduleData = self.execute_query(graphql_query, variables).await?;

        Ok(SchedulePage {
            items: data
                .page
                .airing_schedules
                .into_iter()
                .map(Self::map_schedule)
                .collect(),
            has_next: data.page.page_info.has_next_page,
        })
    }
}
