// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// This file declares all domain modules and re-exports their public API.
// All other modules import from `crate::domain::*`

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod episode;
pub mod notification;
pub mod provenance;
pub mod reminder;
pub mod show;
pub mod sync_state;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Show Domain
pub use show::{validate_show, Show};

// Episode Domain
pub use episode::{validate_episode, Episode};

// Reminder Domain
pub use reminder::{
    validate_reminder, EmailTarget, Reminder, MAX_LEAD_MINUTES, MIN_LEAD_MINUTES,
};

// Notification Ledger
pub use notification::{Channel, NotificationAttempt};

// Provenance
pub use provenance::Provenance;

// Sync State
pub use sync_state::SyncState;

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Lead time {minutes} minutes outside permitted range {MIN_LEAD_MINUTES}-{MAX_LEAD_MINUTES}")]
    LeadTimeOutOfRange { minutes: u32 },

    #[error("Reminder has no delivery target")]
    NoDeliveryTarget,

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
