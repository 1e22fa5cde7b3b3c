// src/lib.rs
// Anibell - Release-event reminder daemon
//
// Architecture:
// - Domain-centric: All business logic lives in domains
// - Event-driven: Services coordinate through events
// - Explicit: No implicit behavior, no magic
// - Two engines: reconciliation pulls the airing schedule, dispatch
//   fires due reminders; both run on independent timers

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;

// ============================================================================
// OUTER LAYER
// ============================================================================

pub mod integrations;
pub mod scheduler;

// ============================================================================
// PUBLIC API - Domain Entities
// ============================================================================

pub use domain::{
    validate_episode,
    validate_reminder,
    validate_show,
    // Notification ledger
    Channel,
    // Reminder
    EmailTarget,
    // Episode
    Episode,
    NotificationAttempt,
    // Provenance
    Provenance,
    Reminder,
    // Show
    Show,
    // Reconciliation state
    SyncState,
    MAX_LEAD_MINUTES,
    MIN_LEAD_MINUTES,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult};

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{
    create_event_bus,
    DomainEvent,
    EpisodeAdded,
    EventBus,
    EventLogEntry,
    NotificationDispatched,
    NotificationFailed,
    ReminderCreated,
    ReminderDeleted,
    ShowAdded,
    SyncRunCompleted,
    SyncRunFailed,
};

// ============================================================================
// PUBLIC API - Database
// ============================================================================

pub use db::{create_connection_pool, default_database_path, initialize_database, ConnectionPool};

// ============================================================================
// PUBLIC API - Repositories
// ============================================================================

pub use repositories::{
    BatchOutcome,
    CatalogRepository,
    EpisodeRepository,
    NotificationRepository,
    ReminderRepository,
    ShowRepository,
    SqliteCatalogRepository,
    SqliteEpisodeRepository,
    SqliteNotificationRepository,
    SqliteReminderRepository,
    SqliteShowRepository,
    SqliteSyncStateRepository,
    SyncItem,
    SyncStateRepository,
};

// ============================================================================
// PUBLIC API - Services
// ============================================================================

pub use services::{
    // Catalog
    CatalogService,
    CreateEpisodeRequest,
    // Reminders
    CreateReminderRequest,
    CreateShowRequest,
    // Dispatch
    DispatchReport,
    DispatchService,
    ReminderService,
    // Reconciliation
    SyncReport,
    SyncService,
};

// ============================================================================
// PUBLIC API - Integrations
// ============================================================================

pub use integrations::{
    AccountDirectory, AiringScheduleSource, AniListClient, EmailDelivery, HttpWebhookDelivery,
    SmtpConfig, SmtpMailer, StaticAccountDirectory, UnconfiguredMailer, WebhookDelivery,
};

// ============================================================================
// PUBLIC API - Configuration & Scheduling
// ============================================================================

pub use config::AppConfig;
pub use scheduler::Scheduler;
