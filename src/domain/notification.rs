// src/domain/notification.rs
//
// Notification ledger row. The (reminder, episode, channel) triple is the
// identity; a row existing means "already dispatched, never resend".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{DomainError, DomainResult};

/// Delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Webhook,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Channel {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "email" => Ok(Channel::Email),
            "webhook" => Ok(Channel::Webhook),
            other => Err(DomainError::UnknownVariant {
                kind: "channel",
                value: other.to_string(),
            }),
        }
    }
}

/// One successfully dispatched notification. Written exactly once per
/// triple, immediately after delivery succeeds; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAttempt {
    pub reminder_id: Uuid,
    pub episode_id: Uuid,
    pub channel: Channel,
    pub sent_at: DateTime<Utc>,
}

impl NotificationAttempt {
    pub fn new(reminder_id: Uuid, episode_id: Uuid, channel: Channel) -> Self {
        Self {
            reminder_id,
            episode_id,
            channel,
            sent_at: Utc::now(),
        }
    }
}
