// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO invariant enforcement
// - NO event emission
// - NO cross-repository calls
// - Explicit SQL only

pub mod catalog_repository;
pub mod episode_repository;
pub mod notification_repository;
pub mod reminder_repository;
pub mod show_repository;
pub mod sync_state_repository;

pub use catalog_repository::{BatchOutcome, CatalogRepository, SqliteCatalogRepository, SyncItem};
pub use episode_repository::{EpisodeRepository, SqliteEpisodeRepository};
pub use notification_repository::{NotificationRepository, SqliteNotificationRepository};
pub use reminder_repository::{ReminderRepository, SqliteReminderRepository};
pub use show_repository::{ShowRepository, SqliteShowRepository};
pub use sync_state_repository::{SqliteSyncStateRepository, SyncStateRepository};
