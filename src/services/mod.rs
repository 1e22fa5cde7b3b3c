// src/services/mod.rs
//
// Service layer: orchestrates repositories and integrations, enforces
// domain invariants at the boundary, and emits events for every state
// change.

pub mod catalog_service;
pub mod dispatch_service;
pub mod reminder_service;
pub mod sync_service;

#[cfg(test)]
mod dispatch_service_tests;

// Catalog
pub use catalog_service::{CatalogService, CreateEpisodeRequest, CreateShowRequest};

// Reminders
pub use reminder_service::{CreateReminderRequest, ReminderService};

// Reconciliation
pub use sync_service::{SyncReport, SyncService};

// Dispatch
pub use dispatch_service::{DispatchReport, DispatchService};
