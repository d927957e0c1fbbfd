use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common_http_errors::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::app::AppState;
use crate::lifecycle::Confirmation;
use crate::webhook::scalar_to_string;

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    #[serde(rename = "orderNumber", default)]
    pub order_number: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CreateLinkResponse {
    #[serde(rename = "paymentLink")]
    pub payment_link: String,
    #[serde(rename = "orderNumber")]
    pub order_number: String,
}

pub async fn create_payment_link(
    State(state): State<AppState>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<Json<CreateLinkResponse>, ApiError> {
    let amount = req.amount.as_ref().and_then(scalar_to_string);
    let order_number = req.order_number.as_ref().and_then(scalar_to_string);
    let link = state
        .lifecycle
        .initiate(amount.as_deref(), order_number.as_deref())
        .await?;
    Ok(Json(CreateLinkResponse {
        payment_link: link.form_url,
        order_number: link.order_number,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub price: Option<String>,
    #[serde(rename = "orderNumber")]
    pub order_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentPageResponse {
    #[serde(rename = "paymentLink")]
    pub payment_link: String,
    #[serde(rename = "orderNumber")]
    pub order_number: String,
    #[serde(rename = "amountMinor")]
    pub amount_minor: i64,
}

pub async fn payment_page(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> Result<Json<PaymentPageResponse>, ApiError> {
    let link = state
        .lifecycle
        .initiate(query.price.as_deref(), query.order_number.as_deref())
        .await?;
    Ok(Json(PaymentPageResponse {
        payment_link: link.form_url,
        order_number: link.order_number,
        amount_minor: link.amount.minor(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

pub async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<String, ApiError> {
    match state.lifecycle.confirm(query.order_id.as_deref()).await? {
        Confirmation::Paid { order_number, .. } => {
            Ok(format!("Payment successful. Order {order_number} has been marked as paid."))
        }
        Confirmation::NotPaid { order_id, message, .. } => Ok(match message {
            Some(reason) => format!("Payment failed for order {order_id}: {reason}"),
            None => format!("Payment failed for order {order_id}."),
        }),
    }
}

pub async fn payment_failure(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> String {
    state.lifecycle.record_failure(query.order_id.as_deref());
    "Payment failed or was cancelled. Please try again.".to_string()
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4"))],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            ApiError::internal(err).into_response()
        }
    }
}
