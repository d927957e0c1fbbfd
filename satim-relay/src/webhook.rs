use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use common_http_errors::ApiError;
use common_money::{is_strictly_positive, parse_price};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::RelayError;

pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
pub const TOPIC_HEADER: &str = "x-shopify-topic";
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";
pub const ORDERS_CREATE_TOPIC: &str = common_observability::HANDLED_WEBHOOK_TOPIC;

type HmacSha256 = Hmac<Sha256>;

/// Base64 HMAC-SHA256 of the raw body, as Shopify sends it.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

pub fn verify_signature(secret: &[u8], body: &[u8], claimed: &str) -> bool {
    let expected = compute_signature(secret, body);
    expected.as_bytes().ct_eq(claimed.trim().as_bytes()).into()
}

/// One inbound webhook request. Discarded once handled.
#[derive(Debug)]
pub struct WebhookEnvelope {
    pub body: Bytes,
    pub topic: String,
    pub shop_domain: String,
    pub signature: String,
}

impl WebhookEnvelope {
    pub fn from_parts(headers: &HeaderMap, body: Bytes) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };
        Self {
            topic: header(TOPIC_HEADER),
            shop_domain: header(SHOP_DOMAIN_HEADER),
            signature: header(HMAC_HEADER),
            body,
        }
    }

    pub fn verify(&self, secret: &[u8]) -> Result<(), RelayError> {
        if self.signature.is_empty() || !verify_signature(secret, &self.body, &self.signature) {
            return Err(RelayError::Auth);
        }
        Ok(())
    }
}

/// Subset of the Shopify order payload the relay needs.
#[derive(Debug, Deserialize)]
struct ShopifyOrder {
    id: Value,
    #[serde(default)]
    total_price: Option<Value>,
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(rename = "paymentLink", skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
}

impl WebhookAck {
    fn accepted() -> Self { Self { status: "accepted", payment_link: None } }
    fn ignored() -> Self { Self { status: "ignored", payment_link: None } }
}

pub async fn handle_shopify_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let Some(secret) = state.config.webhook_secret.as_deref() else {
        return Err(ApiError::NotFound { code: "webhook_disabled" });
    };
    let envelope = WebhookEnvelope::from_parts(&headers, body);
    if let Err(err) = envelope.verify(secret.as_bytes()) {
        warn!(topic = %envelope.topic, shop = %envelope.shop_domain, "Shopify webhook signature mismatch");
        state.metrics.record_webhook(&envelope.topic, "rejected");
        return Err(err.into());
    }
    info!(topic = %envelope.topic, shop = %envelope.shop_domain, "Shopify webhook received");

    if envelope.topic != ORDERS_CREATE_TOPIC {
        state.metrics.record_webhook(&envelope.topic, "ignored");
        return Ok(Json(WebhookAck::ignored()));
    }

    let order = match serde_json::from_slice::<ShopifyOrder>(&envelope.body) {
        Ok(order) => order,
        Err(err) => {
            warn!(error = %err, shop = %envelope.shop_domain, "Unparseable orders/create payload");
            state.metrics.record_webhook(&envelope.topic, "malformed");
            return Ok(Json(WebhookAck::accepted()));
        }
    };
    let Some(order_id) = scalar_to_string(&order.id) else {
        warn!(shop = %envelope.shop_domain, "orders/create payload without an order id");
        state.metrics.record_webhook(&envelope.topic, "malformed");
        return Ok(Json(WebhookAck::accepted()));
    };
    let total = order.total_price.as_ref().and_then(scalar_to_string);
    let positive = total
        .as_deref()
        .and_then(|raw| parse_price(raw).ok())
        .map(|price| is_strictly_positive(&price))
        .unwrap_or(false);
    if !positive {
        info!(order_id = %order_id, total = ?total, "Order total not positive; no payment link generated");
        state.metrics.record_webhook(&envelope.topic, "skipped");
        return Ok(Json(WebhookAck::accepted()));
    }

    match state.lifecycle.initiate(total.as_deref(), Some(order_id.as_str())).await {
        Ok(link) => {
            info!(order_id = %order_id, payment_link = %link.form_url, "Payment link generated for new order");
            state.metrics.record_webhook(&envelope.topic, "accepted");
            Ok(Json(WebhookAck { status: "accepted", payment_link: Some(link.form_url) }))
        }
        Err(err) => {
            // The webhook itself is valid; generation failures are logged, not bounced back to Shopify.
            warn!(order_id = %order_id, error = %err, "Payment link generation failed for new order");
            state.metrics.record_webhook(&envelope.topic, "link_failed");
            Ok(Json(WebhookAck::accepted()))
        }
    }
}
