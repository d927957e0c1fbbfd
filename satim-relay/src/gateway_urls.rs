//! Pure construction of SATIM request URLs. Nothing in here performs I/O.

use bigdecimal::BigDecimal;
use common_money::{parse_price, MinorAmount, MoneyError};
use reqwest::Url;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::config::GatewayConfig;

/// ISO 4217 numeric code for the Algerian dinar.
pub const CURRENCY_DZD: &str = "012";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("price is required")]
    Missing,
    #[error("price must be numeric, got '{0}'")]
    NotNumeric(String),
    #[error("minimum price is {minimum}")]
    BelowMinimum { minimum: String },
    #[error("price '{0}' cannot be expressed in whole centimes")]
    Precision(String),
}

impl From<MoneyError> for PriceError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::NotNumeric(raw) => PriceError::NotNumeric(raw),
            MoneyError::SubMinorPrecision(raw) | MoneyError::OutOfRange(raw) => PriceError::Precision(raw),
        }
    }
}

/// Validate a caller-declared price against the gateway minimum and convert it to minor units.
pub fn validate_price(raw: Option<&str>, minimum: &BigDecimal) -> Result<MinorAmount, PriceError> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty()).ok_or(PriceError::Missing)?;
    let price = parse_price(raw)?;
    if price < *minimum {
        return Err(PriceError::BelowMinimum { minimum: minimum.to_string() });
    }
    Ok(MinorAmount::from_major(price)?)
}

/// Pseudo-random 10 digit order number for requests that do not carry one.
pub fn generate_order_number() -> String {
    let value = Uuid::new_v4().as_u128() % 10_000_000_000;
    format!("{value:010}")
}

/// `register.do` URL. The order number is echoed in `udf1` so the confirmation can be correlated.
pub fn register_url(gateway: &GatewayConfig, order_number: &str, amount: &MinorAmount) -> Url {
    let json_params = json!({
        "force_terminal_id": gateway.credentials.terminal_id,
        "udf1": order_number,
    })
    .to_string();
    let mut url = gateway.register_endpoint.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("userName", &gateway.credentials.username)
        .append_pair("password", &gateway.credentials.password)
        .append_pair("orderNumber", order_number)
        .append_pair("amount", &amount.minor().to_string())
        .append_pair("currency", CURRENCY_DZD)
        .append_pair("returnUrl", &gateway.return_url)
        .append_pair("failUrl", &gateway.fail_url)
        .append_pair("language", &gateway.language)
        .append_pair("jsonParams", &json_params);
    url
}

/// `confirmOrder.do` URL for a gateway-assigned order id.
pub fn confirm_url(gateway: &GatewayConfig, order_id: &str) -> Url {
    let mut url = gateway.confirm_endpoint.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("userName", &gateway.credentials.username)
        .append_pair("password", &gateway.credentials.password)
        .append_pair("orderId", order_id)
        .append_pair("language", &gateway.language);
    url
}

/// Copy of `url` safe for logs: the password parameter is masked.
pub fn redacted(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "password" { "***".to_string() } else { value.into_owned() };
            (key.into_owned(), value)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
