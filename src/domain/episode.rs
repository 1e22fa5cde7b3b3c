// src/domain/episode.rs
//
// Episode - one scheduled airing belonging to a Show. The airing instant
// is an absolute UTC timestamp; upstream schedule corrections move it on
// later reconciliation runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::provenance::Provenance;
use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Internal immutable identifier
    pub id: Uuid,

    /// Owning show
    pub show_id: Uuid,

    /// Ordinal within the show, starting at 1. Unique per show.
    pub number: u32,

    /// Display title (if known)
    pub title: Option<String>,

    /// Airing instant, UTC
    pub airs_at: DateTime<Utc>,

    pub provenance: Provenance,

    /// Upstream identifier, present exactly when provenance is not local
    pub external_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Episode {
    pub fn new_local(show_id: Uuid, number: u32, airs_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            show_id,
            number,
            title: None,
            airs_at,
            provenance: Provenance::Local,
            external_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_synced(
        show_id: Uuid,
        number: u32,
        airs_at: DateTime<Utc>,
        provenance: Provenance,
        external_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            show_id,
            number,
            title: None,
            airs_at,
            provenance,
            external_id: Some(external_id),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validates all Episode invariants.
pub fn validate_episode(episode: &Episode) -> DomainResult<()> {
    if episode.number < 1 {
        return Err(DomainError::InvariantViolation(
            "Episode number must be at least 1".to_string(),
        ));
    }

    match (&episode.provenance, &episode.external_id) {
        (Provenance::Local, Some(_)) => Err(DomainError::InvariantViolation(
            "Local episode cannot carry an external id".to_string(),
        )),
        (Provenance::Local, None) => Ok(()),
        (_, None) => Err(DomainError::InvariantViolation(
            "Synced episode must carry an external id".to_string(),
        )),
        (_, Some(ext)) if ext.trim().is_empty() => Err(DomainError::InvariantViolation(
            "External id cannot be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_local_episode() {
        let episode = Episode::new_local(Uuid::new_v4(), 1, Utc::now());
        assert!(validate_episode(&episode).is_ok());
    }

    #[test]
    fn test_zero_number_fails() {
        let episode = Episode::new_local(Uuid::new_v4(), 0, Utc::now());
        assert!(validate_episode(&episode).is_err());
    }

    #[test]
    fn test_synced_episode_keeps_external_id() {
        let episode = Episode::new_synced(
            Uuid::new_v4(),
            3,
            Utc::now(),
            Provenance::Anilist,
            "9912".to_string(),
        );
        assert!(validate_episode(&episode).is_ok());
    }
}
