// src/services/catalog_service.rs
//
// Local catalog curation: seeding shows and episodes, and the read paths
// listing/query consumers use. Synced rows enter the catalog through the
// reconciliation engine, never through this service.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{validate_episode, validate_show, Episode, Show};
use crate::error::{AppError, AppResult};
use crate::events::{EpisodeAdded, EventBus, ShowAdded};
use crate::repositories::{EpisodeRepository, ShowRepository};

#[derive(Debug, Clone)]
pub struct CreateShowRequest {
    pub title: String,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CreateEpisodeRequest {
    pub show_id: Uuid,
    pub number: u32,
    pub title: Option<String>,
    pub airs_at: DateTime<Utc>,
}

pub struct CatalogService {
    shows: Arc<dyn ShowRepository>,
    episodes: Arc<dyn EpisodeRepository>,
    event_bus: Arc<EventBus>,
}

impl CatalogService {
    pub fn new(
        shows: Arc<dyn ShowRepository>,
        episodes: Arc<dyn EpisodeRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            shows,
            episodes,
            event_bus,
        }
    }

    pub fn add_show(&self, request: CreateShowRequest) -> AppResult<Uuid> {
        let mut show = Show::new_local(request.title);
        show.cover_url = request.cover_url;
        show.synopsis = request.synopsis;
        show.episode_count = request.episode_count;

        validate_show(&show).map_err(AppError::Domain)?;
        self.shows.save(&show)?;

        self.event_bus
            .emit(ShowAdded::new(show.id, show.title.clone()));
        Ok(show.id)
    }

    pub fn add_episode(&self, request: CreateEpisodeRequest) -> AppResult<Uuid> {
        if !self.shows.exists(request.show_id)? {
            return Err(AppError::NotFound);
        }

        let mut episode = Episode::new_local(request.show_id, request.number, request.airs_at);
        episode.title = request.title;

        validate_episode(&episode).map_err(AppError::Domain)?;
        self.episodes.save(&episode)?;

        self.event_bus.emit(EpisodeAdded::new(
            episode.id,
            episode.show_id,
            episode.number,
        ));
        Ok(episode.id)
    }

    pub fn get_show(&self, id: Uuid) -> AppResult<Option<Show>> {
        self.shows.get_by_id(id)
    }

    pub fn list_shows(&self) -> AppResult<Vec<Show>> {
        self.shows.list_all()
    }

    pub fn list_episodes(&self, show_id: Uuid) -> AppResult<Vec<Episode>> {
        self.episodes.list_by_show(show_id)
    }

    /// Episodes airing within the next `within` from now, soonest first.
    pub fn list_upcoming(&self, within: Duration) -> AppResult<Vec<Episode>> {
        let now = Utc::now();
        self.episodes.list_airing_between(now, now + within)
    }
}
