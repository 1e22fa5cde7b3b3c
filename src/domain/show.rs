// src/domain/show.rs
//
// Show - the trackable catalog entity. Shows are seeded locally or merged
// in from an upstream source; synced shows keep their identity across
// reconciliation runs while display fields get refreshed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::provenance::Provenance;
use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    /// Internal immutable identifier
    pub id: Uuid,

    /// Display title
    pub title: String,

    /// Cover image URL (if known)
    pub cover_url: Option<String>,

    /// Short description, plain text (markup stripped at the boundary)
    pub synopsis: Option<String>,

    /// Total number of episodes (if known)
    pub episode_count: Option<u32>,

    /// Where this row came from
    pub provenance: Provenance,

    /// Upstream identifier, present exactly when provenance is not local
    pub external_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Show {
    /// Create a locally-curated show. Local rows never carry an external id.
    pub fn new_local(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            cover_url: None,
            synopsis: None,
            episode_count: None,
            provenance: Provenance::Local,
            external_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a show merged in from an upstream source.
    pub fn new_synced(title: String, provenance: Provenance, external_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            cover_url: None,
            synopsis: None,
            episode_count: None,
            provenance,
            external_id: Some(external_id),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validates all Show invariants.
pub fn validate_show(show: &Show) -> DomainResult<()> {
    if show.title.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Show title cannot be empty".to_string(),
        ));
    }

    match (&show.provenance, &show.external_id) {
        (Provenance::Local, Some(_)) => Err(DomainError::InvariantViolation(
            "Local show cannot carry an external id".to_string(),
        )),
        (Provenance::Local, None) => Ok(()),
        (_, None) => Err(DomainError::InvariantViolation(
            "Synced show must carry an external id".to_string(),
        )),
        (_, Some(ext)) if ext.trim().is_empty() => Err(DomainError::InvariantViolation(
            "External id cannot be empty".to_string(),
        )),
        _ => Ok(()),
    }
}
