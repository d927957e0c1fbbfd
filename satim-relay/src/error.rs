use common_http_errors::ApiError;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::gateway_urls::PriceError;
use crate::platform::PlatformError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidPrice(#[from] PriceError),
    #[error("orderId is required")]
    MissingOrderId,
    #[error("gateway rejected the request (errorCode {code}): {message}")]
    GatewayBusiness { code: i64, message: String },
    #[error("{0}")]
    Transport(#[from] GatewayError),
    #[error("gateway accepted the order but returned no payment link")]
    MissingFormUrl,
    #[error("webhook signature mismatch")]
    Auth,
    #[error("{0}")]
    PlatformUpdate(#[from] PlatformError),
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let message = err.to_string();
        match err {
            RelayError::InvalidPrice(PriceError::Missing) => ApiError::bad_request("missing_price", message),
            RelayError::InvalidPrice(PriceError::NotNumeric(_) | PriceError::Precision(_)) => {
                ApiError::bad_request("invalid_price", message)
            }
            RelayError::InvalidPrice(PriceError::BelowMinimum { .. }) => {
                ApiError::bad_request("price_below_minimum", message)
            }
            RelayError::MissingOrderId => ApiError::bad_request("missing_order_id", message),
            RelayError::GatewayBusiness { message, .. } => ApiError::bad_request("gateway_rejected", message),
            RelayError::Transport(_) | RelayError::MissingFormUrl => {
                ApiError::bad_gateway("gateway_unavailable", message)
            }
            RelayError::Auth => ApiError::Unauthorized { code: "invalid_signature" },
            RelayError::PlatformUpdate(_) => ApiError::Internal {
                code: "platform_update_failed",
                message: Some(message),
            },
        }
    }
}
