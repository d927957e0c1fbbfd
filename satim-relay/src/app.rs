use std::sync::Arc;

use anyhow::Context;
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method};
use axum::{middleware, routing::{get, post}, Router};
use common_observability::RelayMetrics;
use reqwest::Client;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::gateway::SatimClient;
use crate::lifecycle::OrderLifecycle;
use crate::payment_handlers::{
    create_payment_link, health, metrics, payment_failure, payment_page, payment_success,
};
use crate::platform::{NoopNotifier, PlatformNotifier, ShopifyNotifier};
use crate::webhook::{handle_shopify_webhook, HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER};

pub const SERVICE_NAME: &str = "satim-relay";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub lifecycle: Arc<OrderLifecycle>,
    pub metrics: RelayMetrics,
}

impl AppState {
    /// Wire the relay with the platform notifier chosen from configuration.
    pub fn from_config(config: RelayConfig) -> anyhow::Result<Self> {
        let client = outbound_client(&config)?;
        let notifier: Arc<dyn PlatformNotifier> = match &config.shopify {
            Some(shopify) => {
                info!(api_base_url = %shopify.api_base_url, api_version = %shopify.api_version, "Shopify notifier enabled");
                Arc::new(ShopifyNotifier::new(client.clone(), shopify.clone()))
            }
            None => {
                warn!("SHOPIFY_STORE / SHOPIFY_ACCESS_TOKEN not set; paid orders will not be pushed to a platform");
                Arc::new(NoopNotifier)
            }
        };
        Self::with_parts(config, client, notifier)
    }

    /// Wire the relay around a caller-supplied notifier.
    pub fn new(config: RelayConfig, notifier: Arc<dyn PlatformNotifier>) -> anyhow::Result<Self> {
        let client = outbound_client(&config)?;
        Self::with_parts(config, client, notifier)
    }

    fn with_parts(
        config: RelayConfig,
        client: Client,
        notifier: Arc<dyn PlatformNotifier>,
    ) -> anyhow::Result<Self> {
        let metrics = RelayMetrics::new().context("Failed to create relay metrics")?;
        common_http_errors::register_metrics(&metrics.registry)
            .context("Failed to register HTTP error metrics")?;
        let config = Arc::new(config);
        let gateway = SatimClient::new(client, metrics.clone());
        let lifecycle = OrderLifecycle::new(config.clone(), gateway, notifier, metrics.clone());
        Ok(Self {
            config,
            lifecycle: Arc::new(lifecycle),
            metrics,
        })
    }
}

fn outbound_client(config: &RelayConfig) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(config.outbound_timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .context("Failed to build outbound HTTP client")
}

pub fn build_router(state: AppState) -> Router {
    let origins = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static(HMAC_HEADER),
            HeaderName::from_static(TOPIC_HEADER),
            HeaderName::from_static(SHOP_DOMAIN_HEADER),
        ]);

    let mut router = Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/create-payment-link", post(create_payment_link))
        .route("/payment", get(payment_page))
        .route("/success", get(payment_success))
        .route("/failure", get(payment_failure));

    if state.config.webhook_secret.is_some() {
        router = router.route("/shopify-webhook", post(handle_shopify_webhook));
    } else {
        info!("SHOPIFY_WEBHOOK_SECRET not set; /shopify-webhook is disabled");
    }

    router
        .with_state(state)
        .layer(middleware::from_fn(common_http_errors::http_error_metrics_layer(SERVICE_NAME)))
        .layer(cors)
}
