// src/integrations/email.rs
//
// Email delivery over async SMTP (lettre). Fire-and-forget from the
// dispatch engine's perspective: errors are returned, the engine logs
// them and may retry on a later tick.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, message::Mailbox,
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
    Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Logical email delivery contract consumed by the dispatch engine.
#[async_trait]
pub trait EmailDelivery: Send + Sync {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;
}

/// SMTP settings for outgoing reminder mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    #[serde(default)]
    pub from_name: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_address: String::new(),
            from_name: None,
        }
    }
}

/// Production email delivery via STARTTLS SMTP.
pub struct SmtpMailer {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> AppResult<Self> {
        if config.smtp_host.is_empty() || config.from_address.is_empty() {
            return Err(AppError::Configuration(
                "SMTP host and from_address must be configured for email delivery".to_string(),
            ));
        }

        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::Configuration(format!("SMTP relay: {}", e)))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { config, transport })
    }
}

/// Stand-in used when SMTP is not configured. The daemon still runs;
/// email attempts fail individually and are logged by the dispatch
/// engine, while webhook deliveries proceed untouched.
pub struct UnconfiguredMailer;

#[async_trait]
impl EmailDelivery for UnconfiguredMailer {
    async fn deliver(&self, to: &str, _subject: &str, _body: &str) -> AppResult<()> {
        Err(AppError::Delivery(format!(
            "email delivery to '{}' skipped: SMTP is not configured",
            to
        )))
    }
}

#[async_trait]
impl EmailDelivery for SmtpMailer {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self.config.from_name.as_deref().unwrap_or("AniBell");
        let from_mailbox: Mailbox = format!("{} <{}>", from_name, self.config.from_address)
            .parse()
            .map_err(|e| AppError::Delivery(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AppError::Delivery(format!("Invalid recipient '{}': {}", to, e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Delivery(format!("Build email: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Delivery(format!("SMTP send: {}", e)))?;

        tracing::info!(recipient = %to, "email delivered");
        Ok(())
    }
}
