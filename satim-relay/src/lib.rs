pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod gateway_urls;
pub mod lifecycle;
pub mod payment_handlers;
pub mod platform;
pub mod webhook;

pub use app::{build_router, AppState};
pub use config::RelayConfig;
pub use error::RelayError;
pub use lifecycle::{Confirmation, OrderLifecycle, OrderState, OrderStatus, PaymentLink};
pub use platform::{NoopNotifier, PlatformError, PlatformNotifier, ShopifyNotifier};
