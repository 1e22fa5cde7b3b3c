// src/domain/reminder.rs
//
// Reminder - an owner-configured rule asking to be notified some minutes
// before an episode airs. Owners create and delete reminders; the engines
// only ever read them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DomainError, DomainResult};

/// Lead time bounds. The dispatch lookahead window is sized against the
/// upper bound, so reminders outside this range are rejected at creation.
pub const MIN_LEAD_MINUTES: u32 = 5;
pub const MAX_LEAD_MINUTES: u32 = 1440;

/// Where reminder emails go. `Account` defers to the owner's account
/// address, resolved through the account directory at dispatch time;
/// `Address` names an explicit recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTarget {
    Account,
    Address(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// Internal immutable identifier
    pub id: Uuid,

    /// Opaque owner reference, resolved externally
    pub owner: String,

    /// Optional show filter; None means every show
    pub show_id: Option<Uuid>,

    /// Email delivery target, if the email channel is configured
    pub email: Option<EmailTarget>,

    /// Webhook delivery URL, if the webhook channel is configured
    pub webhook_url: Option<String>,

    /// Minutes before airing to fire
    pub lead_minutes: u32,

    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        owner: String,
        show_id: Option<Uuid>,
        email: Option<EmailTarget>,
        webhook_url: Option<String>,
        lead_minutes: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            show_id,
            email,
            webhook_url,
            lead_minutes,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// True when this reminder applies to episodes of the given show.
    pub fn matches_show(&self, show_id: Uuid) -> bool {
        self.show_id.map_or(true, |filter| filter == show_id)
    }
}

/// Validates all Reminder invariants. Runs at creation time so that a
/// misconfigured reminder never reaches the dispatch engine.
pub fn validate_reminder(reminder: &Reminder) -> DomainResult<()> {
    if reminder.owner.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Reminder owner cannot be empty".to_string(),
        ));
    }

    if reminder.lead_minutes < MIN_LEAD_MINUTES || reminder.lead_minutes > MAX_LEAD_MINUTES {
        return Err(DomainError::LeadTimeOutOfRange {
            minutes: reminder.lead_minutes,
        });
    }

    if reminder.email.is_none() && reminder.webhook_url.is_none() {
        return Err(DomainError::NoDeliveryTarget);
    }

    if let Some(EmailTarget::Address(address)) = &reminder.email {
        if !address.contains('@') {
            return Err(DomainError::InvariantViolation(format!(
                "Invalid email address '{}'",
                address
            )));
        }
    }

    if let Some(url) = &reminder.webhook_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(DomainError::InvariantViolation(format!(
                "Webhook URL must be http(s): '{}'",
                url
            )));
        }
    }

    Ok(())
}
