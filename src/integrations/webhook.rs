// src/integrations/webhook.rs
//
// Webhook delivery: one HTTP POST with a JSON payload, bounded timeout.
// Any non-2xx response counts as a failed delivery.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Logical webhook delivery contract consumed by the dispatch engine.
#[async_trait]
pub trait WebhookDelivery: Send + Sync {
    async fn deliver(&self, url: &str, payload: &serde_json::Value) -> AppResult<()>;
}

/// Production webhook delivery over HTTP.
pub struct HttpWebhookDelivery {
    http_client: Client,
}

impl HttpWebhookDelivery {
    /// `timeout` bounds the whole request so a hung endpoint cannot
    /// stall the dispatch tick.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl WebhookDelivery for HttpWebhookDelivery {
    async fn deliver(&self, url: &str, payload: &serde_json::Value) -> AppResult<()> {
        let response = self
            .http_client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Delivery(format!("Webhook POST: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Delivery(format!(
                "Webhook endpoint returned {}",
                status
            )));
        }

        tracing::info!(url = %url, "webhook delivered");
        Ok(())
    }
}
