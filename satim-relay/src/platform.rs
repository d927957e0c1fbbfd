use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ShopifyConfig;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform rejected order update: {status}")]
    Rejected { status: String },
    #[error("platform request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Pushes the paid status of an order back to the e-commerce platform.
#[async_trait::async_trait]
pub trait PlatformNotifier: Send + Sync {
    async fn mark_paid(&self, order_id: &str) -> Result<(), PlatformError>;
}

/// Used when no platform credentials are configured.
pub struct NoopNotifier;

#[async_trait::async_trait]
impl PlatformNotifier for NoopNotifier {
    async fn mark_paid(&self, order_id: &str) -> Result<(), PlatformError> {
        info!(order_id, "No platform configured; skipping paid-status update");
        Ok(())
    }
}

pub struct ShopifyNotifier {
    client: Client,
    config: ShopifyConfig,
}

impl ShopifyNotifier {
    pub fn new(client: Client, config: ShopifyConfig) -> Self {
        Self { client, config }
    }

    fn order_url(&self, order_id: &str) -> String {
        format!(
            "{}/admin/api/{}/orders/{}.json",
            self.config.api_base_url, self.config.api_version, order_id
        )
    }
}

/// Shopify ids are numeric; anything else is passed through as a string.
fn order_id_value(order_id: &str) -> Value {
    match order_id.parse::<u64>() {
        Ok(id) => json!(id),
        Err(_) => json!(order_id),
    }
}

#[async_trait::async_trait]
impl PlatformNotifier for ShopifyNotifier {
    async fn mark_paid(&self, order_id: &str) -> Result<(), PlatformError> {
        let body = json!({
            "order": {
                "id": order_id_value(order_id),
                "financial_status": "paid",
            }
        });
        let response = self
            .client
            .put(self.order_url(order_id))
            .header("X-Shopify-Access-Token", &self.config.access_token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let status_text = match status.canonical_reason() {
                Some(reason) => format!("{} {}", status.as_u16(), reason),
                None => status.as_u16().to_string(),
            };
            warn!(order_id, status = %status_text, "Shopify rejected paid-status update");
            return Err(PlatformError::Rejected { status: status_text });
        }
        info!(order_id, "Shopify order marked as paid");
        Ok(())
    }
}
