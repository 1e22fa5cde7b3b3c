// src/events/types.rs
//
// All domain events in the system.
// Each event represents an immutable fact that has already occurred.
//
// CRITICAL RULES:
// - Events are facts, not commands
// - Events are immutable
// - Events carry only the data needed to react
// - No business logic in event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Channel;

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

// ============================================================================
// RECONCILIATION EVENTS
// ============================================================================

/// Emitted when a reconciliation run completes successfully
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub source: String,
    pub fetched: usize,
    pub shows_upserted: usize,
    pub episodes_upserted: usize,
    pub skipped: usize,
}

impl SyncRunCompleted {
    pub fn new(
        source: String,
        fetched: usize,
        shows_upserted: usize,
        episodes_upserted: usize,
        skipped: usize,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            source,
            fetched,
            shows_upserted,
            episodes_upserted,
            skipped,
        }
    }
}

impl DomainEvent for SyncRunCompleted {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "SyncRunCompleted" }
}

/// Emitted when a reconciliation run fails at the run boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunFailed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub source: String,
    pub error: String,
}

impl SyncRunFailed {
    pub fn new(source: String, error: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            source,
            error,
        }
    }
}

impl DomainEvent for SyncRunFailed {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "SyncRunFailed" }
}

// ============================================================================
// DISPATCH EVENTS
// ============================================================================

/// Emitted after a notification is delivered and ledgered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDispatched {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub reminder_id: Uuid,
    pub episode_id: Uuid,
    pub channel: Channel,
}

impl NotificationDispatched {
    pub fn new(reminder_id: Uuid, episode_id: Uuid, channel: Channel) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            reminder_id,
            episode_id,
            channel,
        }
    }
}

impl DomainEvent for NotificationDispatched {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "NotificationDispatched" }
}

/// Emitted when a single delivery attempt fails. The ledger stays
/// untouched, so the attempt retries on a later tick while the due
/// window remains open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFailed {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub reminder_id: Uuid,
    pub episode_id: Uuid,
    pub channel: Channel,
    pub error: String,
}

impl NotificationFailed {
    pub fn new(reminder_id: Uuid, episode_id: Uuid, channel: Channel, error: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            reminder_id,
            episode_id,
            channel,
            error,
        }
    }
}

impl DomainEvent for NotificationFailed {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "NotificationFailed" }
}

// ============================================================================
// CATALOG EVENTS
// ============================================================================

/// Emitted when a show is added to the local catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowAdded {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub show_id: Uuid,
    pub title: String,
}

impl ShowAdded {
    pub fn new(show_id: Uuid, title: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            show_id,
            title,
        }
    }
}

impl DomainEvent for ShowAdded {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "ShowAdded" }
}

/// Emitted when an episode is added to the local catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeAdded {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub episode_id: Uuid,
    pub show_id: Uuid,
    pub number: u32,
}

impl EpisodeAdded {
    pub fn new(episode_id: Uuid, show_id: Uuid, number: u32) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            episode_id,
            show_id,
            number,
        }
    }
}

impl DomainEvent for EpisodeAdded {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "EpisodeAdded" }
}

// ============================================================================
// REMINDER EVENTS
// ============================================================================

/// Emitted when an owner creates a reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderCreated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub reminder_id: Uuid,
    pub owner: String,
}

impl ReminderCreated {
    pub fn new(reminder_id: Uuid, owner: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            reminder_id,
            owner,
        }
    }
}

impl DomainEvent for ReminderCreated {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "ReminderCreated" }
}

/// Emitted when an owner deletes a reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderDeleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub reminder_id: Uuid,
}

impl ReminderDeleted {
    pub fn new(reminder_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            reminder_id,
        }
    }
}

impl DomainEvent for ReminderDeleted {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "ReminderDeleted" }
}
