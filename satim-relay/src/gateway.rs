use std::time::Instant;

use common_observability::RelayMetrics;
use reqwest::{Client, Url};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway_urls::redacted;

/// SATIM reports 2 in `orderStatus` once the card payment is deposited.
pub const ORDER_STATUS_PAID: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOperation {
    Register,
    Confirm,
}

impl GatewayOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayOperation::Register => "register",
            GatewayOperation::Confirm => "confirm",
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway answered HTTP {status}")]
    Status { status: u16 },
    #[error("gateway response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    fn outcome(&self) -> &'static str {
        match self {
            GatewayError::Transport(err) if err.is_timeout() => "timeout",
            GatewayError::Transport(_) => "transport_error",
            GatewayError::Status { .. } => "http_error",
            GatewayError::Decode(_) => "decode_error",
        }
    }
}

/// `register.do` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(rename = "errorCode", alias = "ErrorCode", default, deserialize_with = "lenient_code")]
    pub error_code: Option<i64>,
    #[serde(rename = "errorMessage", alias = "ErrorMessage", default)]
    pub error_message: Option<String>,
    #[serde(rename = "orderId", default)]
    pub order_id: Option<String>,
    #[serde(rename = "formUrl", default)]
    pub form_url: Option<String>,
}

/// `confirmOrder.do` response body. SATIM capitalises most keys here; both spellings are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderStatusResponse {
    #[serde(rename = "errorCode", alias = "ErrorCode", default, deserialize_with = "lenient_code")]
    pub error_code: Option<i64>,
    #[serde(rename = "errorMessage", alias = "ErrorMessage", default)]
    pub error_message: Option<String>,
    #[serde(rename = "orderStatus", alias = "OrderStatus", default, deserialize_with = "lenient_code")]
    pub order_status: Option<i64>,
    #[serde(rename = "orderNumber", alias = "OrderNumber", default)]
    pub order_number: Option<String>,
    #[serde(rename = "actionCodeDescription", default)]
    pub action_code_description: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl OrderStatusResponse {
    pub fn is_paid(&self) -> bool {
        self.order_status == Some(ORDER_STATUS_PAID)
    }

    /// The merchant order number, from the response itself or from the `udf1` echo.
    pub fn merchant_order_number(&self) -> Option<String> {
        self.order_number
            .clone()
            .filter(|value| !value.is_empty())
            .or_else(|| {
                self.params
                    .as_ref()
                    .and_then(|params| params.get("udf1"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
    }
}

/// Codes arrive as numbers on some endpoints and as strings on others.
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

#[derive(Clone)]
pub struct SatimClient {
    client: Client,
    metrics: RelayMetrics,
}

impl SatimClient {
    pub fn new(client: Client, metrics: RelayMetrics) -> Self {
        Self { client, metrics }
    }

    /// Single GET against the gateway, decoded as JSON. No retries.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        operation: GatewayOperation,
        url: Url,
    ) -> Result<T, GatewayError> {
        let shown = redacted(&url);
        debug!(operation = operation.as_str(), url = %shown, "Calling SATIM gateway");
        let started = Instant::now();
        let result = self.send(url).await;
        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(_) => self.metrics.record_gateway_call(operation.as_str(), "ok", elapsed),
            Err(err) => {
                warn!(operation = operation.as_str(), url = %shown, error = %err, "SATIM gateway call failed");
                self.metrics.record_gateway_call(operation.as_str(), err.outcome(), elapsed);
            }
        }
        result
    }

    async fn send<T: DeserializeOwned>(&self, url: Url) -> Result<T, GatewayError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), body = %body, "SATIM gateway response");
        if !status.is_success() {
            return Err(GatewayError::Status { status: status.as_u16() });
        }
        Ok(serde_json::from_str(&body)?)
    }
}
