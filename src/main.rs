// src/main.rs
// AniBell daemon entrypoint: wires storage, integrations, services and
// the two timer loops, then idles until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use anibell::integrations::UnconfiguredMailer;
use anibell::{
    create_connection_pool, create_event_bus, default_database_path, initialize_database,
    AccountDirectory, AniListClient, AppConfig, DispatchService, EmailDelivery,
    HttpWebhookDelivery, NotificationDispatched, NotificationFailed, Scheduler, SmtpMailer,
    StaticAccountDirectory, SyncRunCompleted, SyncRunFailed, SyncService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("anibell=info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("load configuration")?;
    config.validate().context("validate configuration")?;

    // Storage
    let db_path = match &config.database.path {
        Some(path) => path.clone(),
        None => default_database_path().context("resolve database path")?,
    };
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create data directory {}", parent.display()))?;
    }
    let pool = Arc::new(create_connection_pool(&db_path).context("open database")?);
    {
        let conn = pool.get().context("checkout connection")?;
        initialize_database(&conn).context("initialize schema")?;
        anibell::db::verify_database_integrity(&conn).context("verify database")?;
    }
    tracing::info!(path = %db_path.display(), "database ready");

    // Events: log subscriptions for the operationally interesting ones
    let event_bus = create_event_bus();
    event_bus.subscribe::<SyncRunCompleted, _>(|e| {
        tracing::info!(
            source = %e.source,
            fetched = e.fetched,
            shows = e.shows_upserted,
            episodes = e.episodes_upserted,
            skipped = e.skipped,
            "catalog reconciled"
        );
    });
    event_bus.subscribe::<SyncRunFailed, _>(|e| {
        tracing::warn!(source = %e.source, error = %e.error, "reconciliation failed");
    });
    event_bus.subscribe::<NotificationDispatched, _>(|e| {
        tracing::info!(
            reminder = %e.reminder_id,
            episode = %e.episode_id,
            channel = %e.channel,
            "reminder dispatched"
        );
    });
    event_bus.subscribe::<NotificationFailed, _>(|e| {
        tracing::warn!(
            reminder = %e.reminder_id,
            episode = %e.episode_id,
            channel = %e.channel,
            error = %e.error,
            "reminder delivery failed"
        );
    });

    // Repositories
    let shows = Arc::new(anibell::SqliteShowRepository::new(pool.clone()));
    let episodes = Arc::new(anibell::SqliteEpisodeRepository::new(pool.clone()));
    let reminders = Arc::new(anibell::SqliteReminderRepository::new(pool.clone()));
    let notifications = Arc::new(anibell::SqliteNotificationRepository::new(pool.clone()));
    let catalog = Arc::new(anibell::SqliteCatalogRepository::new(pool.clone()));
    let sync_state = Arc::new(anibell::SqliteSyncStateRepository::new(pool.clone()));

    // Integrations
    let upstream = Arc::new(
        AniListClient::new(Duration::from_secs(config.sync.timeout_secs))
            .context("build upstream client")?,
    );
    let email: Arc<dyn EmailDelivery> = if config.email.smtp_host.is_empty() {
        tracing::warn!("SMTP not configured; email reminders will fail until it is");
        Arc::new(UnconfiguredMailer)
    } else {
        Arc::new(SmtpMailer::new(config.email.clone()).context("build SMTP transport")?)
    };
    let webhook = Arc::new(
        HttpWebhookDelivery::new(Duration::from_secs(config.webhook.timeout_secs))
            .context("build webhook client")?,
    );
    let accounts: Arc<dyn AccountDirectory> =
        Arc::new(StaticAccountDirectory::new(config.accounts.clone()));

    // Services
    let sync_service = Arc::new(SyncService::new(
        upstream,
        catalog,
        sync_state,
        event_bus.clone(),
        config.sync.clone(),
    ));
    let dispatch_service = Arc::new(DispatchService::new(
        reminders,
        episodes,
        shows,
        notifications,
        email,
        webhook,
        accounts,
        event_bus.clone(),
        config.dispatch.clone(),
    ));

    let scheduler = Scheduler::new(sync_service, dispatch_service);
    scheduler.start(
        Duration::from_secs(config.sync.interval_minutes * 60),
        Duration::from_secs(config.dispatch.tick_seconds),
    );

    tokio::signal::ctrl_c().await.context("wait for Ctrl-C")?;
    tracing::info!("shutting down");
    scheduler.shutdown();

    Ok(())
}
