// src/scheduler/mod.rs
//
// Timer loops driving the two engines. Each engine runs on its own
// tokio task with its own tokio::interval, so a slow reconciliation
// run never delays dispatch scans. A failed run is logged and the loop
// keeps ticking.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::AppResult;
use crate::services::{DispatchReport, DispatchService, SyncReport, SyncService};

pub struct Scheduler {
    sync_service: Arc<SyncService>,
    dispatch_service: Arc<DispatchService>,
    sync_handle: Mutex<Option<JoinHandle<()>>>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(sync_service: Arc<SyncService>, dispatch_service: Arc<DispatchService>) -> Self {
        Self {
            sync_service,
            dispatch_service,
            sync_handle: Mutex::new(None),
            dispatch_handle: Mutex::new(None),
        }
    }

    /// Spawn both timer loops. The first tick of each interval fires
    /// immediately, so the catalog is reconciled and due reminders are
    /// scanned right at startup.
    pub fn start(&self, sync_interval: Duration, dispatch_tick: Duration) {
        tracing::info!(
            sync_interval_secs = sync_interval.as_secs(),
            dispatch_tick_secs = dispatch_tick.as_secs(),
            "starting scheduler"
        );

        let sync_service = self.sync_service.clone();
        let sync_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sync_interval);
            loop {
                interval.tick().await;
                match sync_service.sync().await {
                    Ok(report) => tracing::info!(
                        fetched = report.fetched,
                        shows = report.shows_upserted,
                        episodes = report.episodes_upserted,
                        skipped = report.skipped,
                        "reconciliation run finished"
                    ),
                    Err(error) => tracing::error!(%error, "reconciliation run failed"),
                }
            }
        });

        let dispatch_service = self.dispatch_service.clone();
        let dispatch_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(dispatch_tick);
            loop {
                interval.tick().await;
                match dispatch_service.scan().await {
                    Ok(report) if report.due_pairs > 0 => tracing::info!(
                        due = report.due_pairs,
                        sent = report.sent,
                        failed = report.failed,
                        "dispatch scan finished"
                    ),
                    Ok(_) => {}
                    Err(error) => tracing::error!(%error, "dispatch scan failed"),
                }
            }
        });

        *self.sync_handle.lock().unwrap() = Some(sync_handle);
        *self.dispatch_handle.lock().unwrap() = Some(dispatch_handle);
    }

    /// Trigger a reconciliation run outside the timer cadence. Shares
    /// the engine's run lock with the timer loop, so overlapping runs
    /// serialize rather than race.
    pub async fn run_sync_now(&self) -> AppResult<SyncReport> {
        self.sync_service.sync().await
    }

    /// Trigger a dispatch scan outside the timer cadence.
    pub async fn run_dispatch_now(&self) -> AppResult<DispatchReport> {
        self.dispatch_service.scan().await
    }

    pub fn shutdown(&self) {
        if let Some(handle) = self.sync_handle.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(handle) = self.dispatch_handle.lock().unwrap().take() {
            handle.abort();
        }
        tracing::info!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
