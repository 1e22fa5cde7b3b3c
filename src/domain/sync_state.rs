// src/domain/sync_state.rs
//
// Last-run bookkeeping for one upstream source. A successful run rewrites
// run timestamp and summary and clears the error; a failed run rewrites
// only the error, so the last-known-good summary survives failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::provenance::Provenance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub source: Provenance,
    pub last_run_at: Option<DateTime<Utc>>,
    /// JSON-encoded summary of the last successful run
    pub last_summary: Option<String>,
    pub last_error: Option<String>,
}
