// src/domain/provenance.rs
//
// Provenance tags where each catalog row came from: seeded locally or
// merged in from an upstream source. Synced rows carry an external id
// scoped to their source; local rows never do.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{DomainError, DomainResult};

/// Origin of a catalog row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Seeded or curated directly in the local store
    Local,
    /// Merged from the AniList airing schedule
    Anilist,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Local => "local",
            Provenance::Anilist => "anilist",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Provenance::Local)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "local" => Ok(Provenance::Local),
            "anilist" => Ok(Provenance::Anilist),
            other => Err(DomainError::UnknownVariant {
                kind: "provenance",
                value: other.to_string(),
            }),
        }
    }
}
