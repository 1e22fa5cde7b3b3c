// src/config.rs
//
// TOML configuration for the daemon. Loaded from
// {CONFIG_DIR}/anibell/config.toml, overridable via ANIBELL_CONFIG.
// Every section has defaults so a missing file yields a runnable config;
// validate() enforces the cross-field rules the engines rely on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::MAX_LEAD_MINUTES;
use crate::error::{AppError, AppResult};
use crate::integrations::SmtpConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub email: SmtpConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Owner reference → account email address, the delivery fallback
    /// for reminders targeting the owner's own account
    #[serde(default)]
    pub accounts: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path; defaults to {DATA_DIR}/anibell/anibell.db
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minutes between reconciliation runs
    #[serde(default = "default_sync_interval_minutes")]
    pub interval_minutes: u64,
    /// Maximum upstream pages fetched per run
    #[serde(default = "default_page_cap")]
    pub page_cap: u32,
    /// How far ahead to ask the upstream source for airings, in days
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Upstream request timeout, seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_sync_interval_minutes() -> u64 {
    60
}
fn default_page_cap() -> u32 {
    5
}
fn default_horizon_days() -> u32 {
    14
}
fn default_upstream_timeout_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_sync_interval_minutes(),
            page_cap: default_page_cap(),
            horizon_days: default_horizon_days(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Seconds between dispatch scans; also the width of the due window
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    /// Hours of upcoming episodes each scan considers. Must exceed the
    /// maximum permitted lead time plus one tick, otherwise an eligible
    /// episode could slip between scans unseen.
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: u64,
}

fn default_tick_seconds() -> u64 {
    60
}
fn default_lookahead_hours() -> u64 {
    48
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            lookahead_hours: default_lookahead_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Webhook POST timeout, seconds
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load from ANIBELL_CONFIG or the default path; a missing file
    /// yields the defaults.
    pub fn load() -> AppResult<Self> {
        let path = match std::env::var_os("ANIBELL_CONFIG") {
            Some(p) => PathBuf::from(p),
            None => Self::default_path()?,
        };

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Configuration(format!("Failed to read config: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> AppResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::Configuration("No config directory".to_string()))?;
        Ok(config_dir.join("anibell").join("config.toml"))
    }

    /// Cross-field rules the engines depend on.
    pub fn validate(&self) -> AppResult<()> {
        if self.sync.interval_minutes == 0 {
            return Err(AppError::Configuration(
                "sync.interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.sync.page_cap == 0 {
            return Err(AppError::Configuration(
                "sync.page_cap must be at least 1".to_string(),
            ));
        }
        if self.dispatch.tick_seconds == 0 {
            return Err(AppError::Configuration(
                "dispatch.tick_seconds must be at least 1".to_string(),
            ));
        }

        // No eligible episode may slip between ticks: the scan window has
        // to cover the longest lead time plus one full tick.
        let lookahead_minutes = self.dispatch.lookahead_hours * 60;
        let tick_minutes = self.dispatch.tick_seconds.div_ceil(60);
        if lookahead_minutes <= MAX_LEAD_MINUTES as u64 + tick_minutes {
            return Err(AppError::Configuration(format!(
                "dispatch.lookahead_hours ({}) must exceed the maximum lead time ({} min) plus one tick",
                self.dispatch.lookahead_hours, MAX_LEAD_MINUTES
            )));
        }

        Ok(())
    }
}
