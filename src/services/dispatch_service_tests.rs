// src/services/dispatch_service_tests.rs
//
// Dispatch engine tests: the due-window tie-break, at-most-once ledger
// writes across repeated and concurrent scans, channel failure isolation,
// and the account-address fallback.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    use crate::config::DispatchConfig;
    use crate::db::{
        create_connection_pool, create_test_pool, initialize_database, ConnectionPool,
    };
    use crate::domain::{Channel, EmailTarget, Episode, Reminder, Show};
    use crate::error::{AppError, AppResult};
    use crate::events::EventBus;
    use crate::integrations::account_directory::MockAccountDirectory;
    use crate::integrations::{AccountDirectory, EmailDelivery, WebhookDelivery};
    use crate::repositories::{
        EpisodeRepository, NotificationRepository, ReminderRepository, ShowRepository,
        SqliteEpisodeRepository, SqliteNotificationRepository, SqliteReminderRepository,
        SqliteShowRepository,
    };
    use crate::services::dispatch_service::DispatchService;

    /// Email stub that records calls and can be scripted to fail the
    /// first N deliveries.
    struct RecordingEmail {
        calls: Mutex<Vec<(String, String)>>,
        fail_remaining: AtomicUsize,
    }

    impl RecordingEmail {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_remaining: AtomicUsize::new(0),
            })
        }

        fn failing_first(n: usize) -> Arc<Self> {
            let stub = Self::new();
            stub.fail_remaining.store(n, Ordering::SeqCst);
            stub
        }

        fn recipients(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(to, _)| to.clone()).collect()
        }
    }

    #[async_trait]
    impl EmailDelivery for RecordingEmail {
        async fn deliver(&self, to: &str, subject: &str, _body: &str) -> AppResult<()> {
            if self
                .fail_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Delivery("smtp unavailable".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    struct RecordingWebhook {
        calls: Mutex<Vec<(String, serde_json::Value)>>,
        always_fail: bool,
    }

    impl RecordingWebhook {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                always_fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                always_fail: true,
            })
        }
    }

    #[async_trait]
    impl WebhookDelivery for RecordingWebhook {
        async fn deliver(&self, url: &str, payload: &serde_json::Value) -> AppResult<()> {
            if self.always_fail {
                return Err(AppError::Delivery("endpoint returned 500".to_string()));
            }
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), payload.clone()));
            Ok(())
        }
    }

    fn no_accounts() -> Arc<dyn AccountDirectory> {
        let mut directory = MockAccountDirectory::new();
        directory.expect_email_for().returning(|_| None);
        Arc::new(directory)
    }

    struct Fixture {
        pool: Arc<ConnectionPool>,
        email: Arc<RecordingEmail>,
        webhook: Arc<RecordingWebhook>,
        service: Arc<DispatchService>,
        show_id: Uuid,
        episode_id: Uuid,
    }

    /// Airing instant used throughout: Show A episode 1 at
    /// 2024-01-10T16:00:00Z.
    fn airs_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 16, 0, 0).unwrap()
    }

    fn build_fixture_on(
        pool: Arc<ConnectionPool>,
        email: Arc<RecordingEmail>,
        webhook: Arc<RecordingWebhook>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Fixture {
        initialize_database(&pool.get().unwrap()).unwrap();

        let show = Show::new_local("Show A".to_string());
        SqliteShowRepository::new(pool.clone()).save(&show).unwrap();

        let episode = Episode::new_local(show.id, 1, airs_at());
        SqliteEpisodeRepository::new(pool.clone())
            .save(&episode)
            .unwrap();

        let service = Arc::new(DispatchService::new(
            Arc::new(SqliteReminderRepository::new(pool.clone())),
            Arc::new(SqliteEpisodeRepository::new(pool.clone())),
            Arc::new(SqliteShowRepository::new(pool.clone())),
            Arc::new(SqliteNotificationRepository::new(pool.clone())),
            email.clone(),
            webhook.clone(),
            accounts,
            Arc::new(EventBus::new()),
            DispatchConfig {
                tick_seconds: 60,
                lookahead_hours: 48,
            },
        ));

        Fixture {
            pool,
            email,
            webhook,
            service,
            show_id: show.id,
            episode_id: episode.id,
        }
    }

    fn build_fixture(
        email: Arc<RecordingEmail>,
        webhook: Arc<RecordingWebhook>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Fixture {
        build_fixture_on(Arc::new(create_test_pool()), email, webhook, accounts)
    }

    fn fixture() -> Fixture {
        build_fixture(RecordingEmail::new(), RecordingWebhook::new(), no_accounts())
    }

    fn add_reminder(f: &Fixture, reminder: &Reminder) {
        SqliteReminderRepository::new(f.pool.clone())
            .save(reminder)
            .unwrap();
    }

    fn email_reminder(f: &Fixture) -> Reminder {
        Reminder::new(
            "user-1".to_string(),
            Some(f.show_id),
            Some(EmailTarget::Address("user1@example.test".to_string())),
            None,
            60,
        )
    }

    fn ledger(f: &Fixture) -> SqliteNotificationRepository {
        SqliteNotificationRepository::new(f.pool.clone())
    }

    #[tokio::test]
    async fn test_end_to_end_single_dispatch() {
        let f = fixture();
        add_reminder(&f, &email_reminder(&f));

        // Scan exactly at trigger time (16:00 - 60 min)
        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.due_pairs, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(f.email.recipients(), vec!["user1@example.test"]);
        assert_eq!(ledger(&f).count().unwrap(), 1);

        // One tick later nothing fires for the same triple
        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 1, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.due_pairs, 0);
        assert_eq!(report.sent, 0);
        assert_eq!(ledger(&f).count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_due_window_boundaries() {
        // One tick early: trigger time not reached
        let f = fixture();
        add_reminder(&f, &email_reminder(&f));
        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 14, 59, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.due_pairs, 0);

        // Exactly at trigger time: due
        let f = fixture();
        add_reminder(&f, &email_reminder(&f));
        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.due_pairs, 1);

        // One tick late: the window has closed, even when no prior
        // scan fired (the silent-miss case)
        let f = fixture();
        add_reminder(&f, &email_reminder(&f));
        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 1, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.due_pairs, 0);
        assert_eq!(ledger(&f).count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_retries_inside_window() {
        let f = build_fixture(
            RecordingEmail::failing_first(1),
            RecordingWebhook::new(),
            no_accounts(),
        );
        add_reminder(&f, &email_reminder(&f));

        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(ledger(&f).count().unwrap(), 0);

        // A re-scan inside the same due window retries and succeeds
        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 30).unwrap())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(ledger(&f).count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_channel_failure_is_isolated() {
        let f = build_fixture(
            RecordingEmail::new(),
            RecordingWebhook::failing(),
            no_accounts(),
        );
        let mut reminder = email_reminder(&f);
        reminder.webhook_url = Some("https://example.test/hook".to_string());
        add_reminder(&f, &reminder);

        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();

        // Email went through despite the webhook failing
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert!(ledger(&f)
            .exists(reminder.id, f.episode_id, Channel::Email)
            .unwrap());
        assert!(!ledger(&f)
            .exists(reminder.id, f.episode_id, Channel::Webhook)
            .unwrap());
    }

    #[tokio::test]
    async fn test_webhook_payload_shape() {
        let f = fixture();
        let reminder = Reminder::new(
            "user-1".to_string(),
            Some(f.show_id),
            None,
            Some("https://example.test/hook".to_string()),
            60,
        );
        add_reminder(&f, &reminder);

        f.service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();

        let calls = f.webhook.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (url, payload) = &calls[0];
        assert_eq!(url, "https://example.test/hook");
        assert_eq!(payload["show"], "Show A");
        assert_eq!(payload["episode_number"], 1);
        assert_eq!(payload["lead_minutes"], 60);
    }

    #[tokio::test]
    async fn test_account_target_resolves_through_directory() {
        let mut directory = MockAccountDirectory::new();
        directory
            .expect_email_for()
            .with(mockall::predicate::eq("user-1"))
            .returning(|_| Some("owner@example.test".to_string()));

        let f = build_fixture(
            RecordingEmail::new(),
            RecordingWebhook::new(),
            Arc::new(directory),
        );
        let reminder = Reminder::new(
            "user-1".to_string(),
            Some(f.show_id),
            Some(EmailTarget::Account),
            None,
            60,
        );
        add_reminder(&f, &reminder);

        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(f.email.recipients(), vec!["owner@example.test"]);
    }

    #[tokio::test]
    async fn test_unroutable_account_target_is_skipped() {
        let f = fixture();
        let reminder = Reminder::new(
            "user-without-account".to_string(),
            Some(f.show_id),
            Some(EmailTarget::Account),
            None,
            60,
        );
        add_reminder(&f, &reminder);

        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.skipped_unroutable, 1);
        assert_eq!(report.sent, 0);
        assert!(f.email.recipients().is_empty());
        assert_eq!(ledger(&f).count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_show_filter_excludes_other_shows() {
        let f = fixture();

        let other_show = Show::new_local("Show B".to_string());
        SqliteShowRepository::new(f.pool.clone())
            .save(&other_show)
            .unwrap();
        let other_episode = Episode::new_local(other_show.id, 1, airs_at());
        SqliteEpisodeRepository::new(f.pool.clone())
            .save(&other_episode)
            .unwrap();

        // Reminder filtered to Show A only
        add_reminder(&f, &email_reminder(&f));

        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.due_pairs, 1);
        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn test_inactive_reminder_never_fires() {
        let f = fixture();
        let mut reminder = email_reminder(&f);
        reminder.active = false;
        add_reminder(&f, &reminder);

        let report = f
            .service
            .scan_at(Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(report.due_pairs, 0);
        assert_eq!(f.email.recipients().len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_scans_dispatch_at_most_once() {
        // On-disk pool so the two scans really hold separate connections
        let dir = tempfile::tempdir().unwrap();
        let pool = create_connection_pool(&dir.path().join("dispatch.db")).unwrap();
        let f = build_fixture_on(
            Arc::new(pool),
            RecordingEmail::new(),
            RecordingWebhook::new(),
            no_accounts(),
        );
        add_reminder(&f, &email_reminder(&f));

        let now = Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap();
        let (a, b) = tokio::join!(f.service.scan_at(now), f.service.scan_at(now));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.sent + b.sent, 1);
        assert_eq!(a.deduplicated + b.deduplicated, 1);
        assert_eq!(f.email.recipients().len(), 1);
        assert_eq!(ledger(&f).count().unwrap(), 1);
    }
}
