use std::sync::Arc;

use common_money::{normalize_scale, MinorAmount};
use common_observability::RelayMetrics;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::gateway::{GatewayOperation, OrderStatusResponse, RegisterResponse, SatimClient};
use crate::gateway_urls::{confirm_url, generate_order_number, register_url, validate_price};
use crate::platform::PlatformNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Requested,
    RegisteredWithGateway,
    ConfirmedPaid,
    ConfirmedFailed,
    VerificationError,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Requested => "requested",
            OrderState::RegisteredWithGateway => "registered_with_gateway",
            OrderState::ConfirmedPaid => "confirmed_paid",
            OrderState::ConfirmedFailed => "confirmed_failed",
            OrderState::VerificationError => "verification_error",
        }
    }

    /// Status as seen by the merchant.
    pub fn order_status(&self) -> OrderStatus {
        match self {
            OrderState::Requested | OrderState::RegisteredWithGateway => OrderStatus::Pending,
            OrderState::ConfirmedPaid => OrderStatus::Paid,
            OrderState::ConfirmedFailed | OrderState::VerificationError => OrderStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

/// Valid transitions:
/// requested -> registered_with_gateway | verification_error
/// registered_with_gateway -> confirmed_paid | confirmed_failed | verification_error
/// Confirmed and errored states are terminal.
pub fn is_valid_transition(from: OrderState, to: OrderState) -> bool {
    match from {
        OrderState::Requested => matches!(to, OrderState::RegisteredWithGateway | OrderState::VerificationError),
        OrderState::RegisteredWithGateway => matches!(
            to,
            OrderState::ConfirmedPaid | OrderState::ConfirmedFailed | OrderState::VerificationError
        ),
        OrderState::ConfirmedPaid | OrderState::ConfirmedFailed | OrderState::VerificationError => false,
    }
}

/// Request-scoped view of one order moving through the protocol.
#[derive(Debug)]
struct OrderTrace {
    reference: String,
    state: OrderState,
}

impl OrderTrace {
    fn starting_at(reference: impl Into<String>, state: OrderState) -> Self {
        Self { reference: reference.into(), state }
    }

    fn advance(&mut self, to: OrderState) {
        if !is_valid_transition(self.state, to) {
            error!(order = %self.reference, from = self.state.as_str(), to = to.as_str(), "Invalid order state transition");
            return;
        }
        debug!(order = %self.reference, from = self.state.as_str(), to = to.as_str(), "Order state transition");
        self.state = to;
    }
}

#[derive(Debug, Clone)]
pub struct PaymentLink {
    pub order_number: String,
    pub gateway_order_id: Option<String>,
    pub amount: MinorAmount,
    pub form_url: String,
    pub state: OrderState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Paid {
        order_id: String,
        order_number: String,
    },
    NotPaid {
        order_id: String,
        order_status: Option<i64>,
        message: Option<String>,
    },
}

impl Confirmation {
    pub fn state(&self) -> OrderState {
        match self {
            Confirmation::Paid { .. } => OrderState::ConfirmedPaid,
            Confirmation::NotPaid { .. } => OrderState::ConfirmedFailed,
        }
    }
}

/// Drives register -> confirm -> notify. Holds only immutable configuration and clients.
pub struct OrderLifecycle {
    config: Arc<RelayConfig>,
    gateway: SatimClient,
    notifier: Arc<dyn PlatformNotifier>,
    metrics: RelayMetrics,
}

impl OrderLifecycle {
    pub fn new(
        config: Arc<RelayConfig>,
        gateway: SatimClient,
        notifier: Arc<dyn PlatformNotifier>,
        metrics: RelayMetrics,
    ) -> Self {
        Self { config, gateway, notifier, metrics }
    }

    /// Register an order with the gateway and return the hosted payment page link.
    pub async fn initiate(
        &self,
        price: Option<&str>,
        order_number: Option<&str>,
    ) -> Result<PaymentLink, RelayError> {
        let amount = validate_price(price, &self.config.gateway.min_price).map_err(|err| {
            warn!(price = price.unwrap_or(""), error = %err, "Rejected payment request");
            err
        })?;
        let order_number = order_number
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_order_number);
        let mut trace = OrderTrace::starting_at(order_number.clone(), OrderState::Requested);

        let url = register_url(&self.config.gateway, &order_number, &amount);
        info!(
            order_number = %order_number,
            amount = %normalize_scale(amount.major()),
            amount_minor = amount.minor(),
            "Registering order with SATIM"
        );
        let response: RegisterResponse = match self.gateway.fetch(GatewayOperation::Register, url).await {
            Ok(response) => response,
            Err(err) => {
                trace.advance(OrderState::VerificationError);
                return Err(err.into());
            }
        };

        match response.error_code.unwrap_or(0) {
            0 => {}
            code => {
                trace.advance(OrderState::VerificationError);
                let message = response
                    .error_message
                    .unwrap_or_else(|| "payment gateway rejected the order".to_string());
                error!(order_number = %order_number, error_code = code, error_message = %message, "SATIM rejected order registration");
                return Err(RelayError::GatewayBusiness { code, message });
            }
        }

        let Some(form_url) = response.form_url.filter(|url| !url.is_empty()) else {
            trace.advance(OrderState::VerificationError);
            error!(order_number = %order_number, "SATIM registration succeeded without formUrl");
            return Err(RelayError::MissingFormUrl);
        };

        trace.advance(OrderState::RegisteredWithGateway);
        info!(order_number = %order_number, gateway_order_id = ?response.order_id, "Payment link created");
        Ok(PaymentLink {
            order_number,
            gateway_order_id: response.order_id,
            amount,
            form_url,
            state: trace.state,
        })
    }

    /// Query the gateway for a registered order; notify the platform when it is paid.
    pub async fn confirm(&self, order_id: Option<&str>) -> Result<Confirmation, RelayError> {
        let order_id = order_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(RelayError::MissingOrderId)?
            .to_string();
        let mut trace = OrderTrace::starting_at(order_id.clone(), OrderState::RegisteredWithGateway);

        let url = confirm_url(&self.config.gateway, &order_id);
        let response: OrderStatusResponse = match self.gateway.fetch(GatewayOperation::Confirm, url).await {
            Ok(response) => response,
            Err(err) => {
                trace.advance(OrderState::VerificationError);
                self.metrics.record_confirmation("error");
                return Err(err.into());
            }
        };

        // Declines arrive with a non-zero code and a real status; only a missing status is a query failure.
        let error_code = response.error_code.unwrap_or(0);
        if error_code != 0 && response.order_status.is_none() {
            trace.advance(OrderState::VerificationError);
            self.metrics.record_confirmation("error");
            let message = response
                .error_message
                .clone()
                .unwrap_or_else(|| "payment gateway could not report the order status".to_string());
            error!(order_id = %order_id, error_code, error_message = %message, "SATIM order status query failed");
            return Err(RelayError::GatewayBusiness { code: error_code, message });
        }

        if !response.is_paid() {
            trace.advance(OrderState::ConfirmedFailed);
            self.metrics.record_confirmation("failed");
            let message = response
                .action_code_description
                .clone()
                .filter(|value| !value.is_empty())
                .or_else(|| response.error_message.clone());
            warn!(order_id = %order_id, error_code, order_status = ?response.order_status, message = ?message, "Payment not completed");
            return Ok(Confirmation::NotPaid {
                order_id,
                order_status: response.order_status,
                message,
            });
        }

        trace.advance(OrderState::ConfirmedPaid);
        self.metrics.record_confirmation("paid");
        let order_number = response.merchant_order_number().unwrap_or_else(|| {
            warn!(order_id = %order_id, "Gateway response carries no order number; using gateway order id");
            order_id.clone()
        });
        info!(order_id = %order_id, order_number = %order_number, "Payment confirmed");

        match self.notifier.mark_paid(&order_number).await {
            Ok(()) => {
                self.metrics.record_platform_update("success");
                Ok(Confirmation::Paid { order_id, order_number })
            }
            Err(err) => {
                self.metrics.record_platform_update("failure");
                error!(order_id = %order_id, order_number = %order_number, error = %err, "Failed to mark platform order as paid");
                Err(err.into())
            }
        }
    }

    /// The gateway redirected the customer to the fail URL. This is a business outcome, not a fault.
    pub fn record_failure(&self, order_id: Option<&str>) -> OrderState {
        let reference = order_id.unwrap_or("unknown");
        let mut trace = OrderTrace::starting_at(reference, OrderState::RegisteredWithGateway);
        trace.advance(OrderState::ConfirmedFailed);
        self.metrics.record_confirmation("failed");
        warn!(order_id = reference, "Customer returned through the payment failure URL");
        trace.state
    }
}
