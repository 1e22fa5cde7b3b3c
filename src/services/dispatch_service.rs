// src/services/dispatch_service.rs
//
// Dispatch engine: on each tick, pair active reminders with upcoming
// episodes, fire the pairs whose trigger time fell inside this tick's
// due window, and ledger each successful delivery so it never repeats.
//
// The due window is the tie-break rule that makes a fixed-cadence scan
// exact-once: a pair is due iff 0 <= now - (airs_at - lead) < tick, so
// each pair belongs to exactly one tick. A failed delivery leaves no
// ledger row and retries on later ticks while the window is open; once
// the window closes the notification is silently missed.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::domain::{Channel, EmailTarget, Episode, NotificationAttempt, Reminder};
use crate::error::AppResult;
use crate::events::{EventBus, NotificationDispatched, NotificationFailed};
use crate::integrations::{AccountDirectory, EmailDelivery, WebhookDelivery};
use crate::repositories::{
    EpisodeRepository, NotificationRepository, ReminderRepository, ShowRepository,
};

/// Summary of one scan. The scheduler logs it; manual triggers and tests
/// read it. Channel failures are counted here, never propagated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// (reminder, episode) pairs whose due window opened this tick
    pub due_pairs: usize,
    pub sent: usize,
    /// Skipped because the ledger already held the triple
    pub deduplicated: usize,
    pub failed: usize,
    /// Account-target emails with no directory entry for the owner
    pub skipped_unroutable: usize,
}

pub struct DispatchService {
    reminders: Arc<dyn ReminderRepository>,
    episodes: Arc<dyn EpisodeRepository>,
    shows: Arc<dyn ShowRepository>,
    ledger: Arc<dyn NotificationRepository>,
    email: Arc<dyn EmailDelivery>,
    webhook: Arc<dyn WebhookDelivery>,
    accounts: Arc<dyn AccountDirectory>,
    event_bus: Arc<EventBus>,
    config: DispatchConfig,
    /// Serializes overlapping scans (timer tick vs. manual trigger)
    run_lock: tokio::sync::Mutex<()>,
}

impl DispatchService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reminders: Arc<dyn ReminderRepository>,
        episodes: Arc<dyn EpisodeRepository>,
        shows: Arc<dyn ShowRepository>,
        ledger: Arc<dyn NotificationRepository>,
        email: Arc<dyn EmailDelivery>,
        webhook: Arc<dyn WebhookDelivery>,
        accounts: Arc<dyn AccountDirectory>,
        event_bus: Arc<EventBus>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            reminders,
            episodes,
            shows,
            ledger,
            email,
            webhook,
            accounts,
            event_bus,
            config,
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one scan as of the wall clock.
    pub async fn scan(&self) -> AppResult<DispatchReport> {
        self.scan_at(Utc::now()).await
    }

    /// Run one scan as of `now`. Store failures propagate; per-channel
    /// delivery failures are isolated so one bad endpoint never blocks
    /// the remaining pairs.
    pub async fn scan_at(&self, now: DateTime<Utc>) -> AppResult<DispatchReport> {
        let _guard = self.run_lock.lock().await;

        let tick = Duration::seconds(self.config.tick_seconds as i64);
        let lookahead = Duration::hours(self.config.lookahead_hours as i64);

        let reminders = self.reminders.list_active()?;
        let episodes = self.episodes.list_airing_between(now, now + lookahead)?;

        let mut report = DispatchReport::default();
        let mut show_titles: HashMap<Uuid, String> = HashMap::new();

        for reminder in &reminders {
            for episode in &episodes {
                if !reminder.matches_show(episode.show_id) {
                    continue;
                }

                let trigger_at = episode.airs_at - Duration::minutes(reminder.lead_minutes as i64);
                let since_trigger = now - trigger_at;
                if since_trigger < Duration::zero() || since_trigger >= tick {
                    continue;
                }

                report.due_pairs += 1;
                let show_title = self.show_title(episode.show_id, &mut show_titles)?;

                if let Some(target) = &reminder.email {
                    match self.resolve_email(reminder, target) {
                        Some(address) => {
                            self.dispatch_email(reminder, episode, &show_title, &address, &mut report)
                                .await?;
                        }
                        None => {
                            tracing::warn!(
                                reminder_id = %reminder.id,
                                owner = %reminder.owner,
                                "no account address for owner, skipping email"
                            );
                            report.skipped_unroutable += 1;
                        }
                    }
                }

                if let Some(url) = &reminder.webhook_url {
                    self.dispatch_webhook(reminder, episode, &show_title, url, &mut report)
                        .await?;
                }
            }
        }

        tracing::debug!(
            due = report.due_pairs,
            sent = report.sent,
            deduplicated = report.deduplicated,
            failed = report.failed,
            "dispatch scan finished"
        );

        Ok(report)
    }

    fn resolve_email(&self, reminder: &Reminder, target: &EmailTarget) -> Option<String> {
        match target {
            EmailTarget::Address(address) => Some(address.clone()),
            EmailTarget::Account => self.accounts.email_for(&reminder.owner),
        }
    }

    fn show_title(
        &self,
        show_id: Uuid,
        cache: &mut HashMap<Uuid, String>,
    ) -> AppResult<String> {
        if let Some(title) = cache.get(&show_id) {
            return Ok(title.clone());
        }

        let title = self
            .shows
            .get_by_id(show_id)?
            .map(|s| s.title)
            .unwrap_or_else(|| "Unknown show".to_string());
        cache.insert(show_id, title.clone());
        Ok(title)
    }

    async fn dispatch_email(
        &self,
        reminder: &Reminder,
        episode: &Episode,
        show_title: &str,
        address: &str,
        report: &mut DispatchReport,
    ) -> AppResult<()> {
        if self.ledger.exists(reminder.id, episode.id, Channel::Email)? {
            report.deduplicated += 1;
            return Ok(());
        }

        let subject = format!("{} episode {} airs soon", show_title, episode.number);
        let body = format!(
            "{} episode {} airs at {}.\nThis reminder fires {} minutes before airing.",
            show_title,
            episode.number,
            episode.airs_at.to_rfc3339(),
            reminder.lead_minutes
        );

        match self.email.deliver(address, &subject, &body).await {
            Ok(()) => self.mark_sent(reminder, episode, Channel::Email, report),
            Err(e) => {
                self.mark_failed(reminder, episode, Channel::Email, e.to_string(), report);
                Ok(())
            }
        }
    }

    async fn dispatch_webhook(
        &self,
        reminder: &Reminder,
        episode: &Episode,
        show_title: &str,
        url: &str,
        report: &mut DispatchReport,
    ) -> AppResult<()> {
        if self.ledger.exists(reminder.id, episode.id, Channel::Webhook)? {
            report.deduplicated += 1;
            return Ok(());
        }

        let payload = serde_json::json!({
            "reminder_id": reminder.id,
            "show_id": episode.show_id,
            "show": show_title,
            "episode_id": episode.id,
            "episode_number": episode.number,
            "airs_at": episode.airs_at.to_rfc3339(),
            "lead_minutes": reminder.lead_minutes,
        });

        match self.webhook.deliver(url, &payload).await {
            Ok(()) => self.mark_sent(reminder, episode, Channel::Webhook, report),
            Err(e) => {
                self.mark_failed(reminder, episode, Channel::Webhook, e.to_string(), report);
                Ok(())
            }
        }
    }

    /// Ledger the triple immediately after the successful delivery. The
    /// ledger write itself is a store failure and does propagate.
    fn mark_sent(
        &self,
        reminder: &Reminder,
        episode: &Episode,
        channel: Channel,
        report: &mut DispatchReport,
    ) -> AppResult<()> {
        self.ledger
            .record(&NotificationAttempt::new(reminder.id, episode.id, channel))?;
        report.sent += 1;
        self.event_bus
            .emit(NotificationDispatched::new(reminder.id, episode.id, channel));
        Ok(())
    }

    fn mark_failed(
        &self,
        reminder: &Reminder,
        episode: &Episode,
        channel: Channel,
        error: String,
        report: &mut DispatchReport,
    ) {
        tracing::warn!(
            reminder_id = %reminder.id,
            episode_id = %episode.id,
            channel = %channel,
            error = %error,
            "delivery failed, will retry while the due window stays open"
        );
        report.failed += 1;
        self.event_bus.emit(NotificationFailed::new(
            reminder.id,
            episode.id,
            channel,
            error,
        ));
    }
}
