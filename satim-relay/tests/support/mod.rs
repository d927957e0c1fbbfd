#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use httpmock::MockServer;
use satim_relay::{build_router, AppState, PlatformError, PlatformNotifier, RelayConfig};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "shpss_test_secret";

pub fn test_config(gateway: &MockServer, extra: &[(&str, &str)]) -> RelayConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("SATIM_USERNAME".into(), "SAT2301160955".into()),
        ("SATIM_PASSWORD".into(), "satim120".into()),
        ("SATIM_TERMINAL_ID".into(), "E010901319".into()),
        ("SATIM_BASE_URL".into(), gateway.url("/payment/rest")),
        ("RELAY_CALLBACK_BASE_URL".into(), "https://relay.example".into()),
        ("SHOPIFY_WEBHOOK_SECRET".into(), WEBHOOK_SECRET.into()),
        ("OUTBOUND_TIMEOUT_SECONDS".into(), "2".into()),
    ]);
    for (key, value) in extra {
        vars.insert((*key).into(), (*value).into());
    }
    RelayConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

/// Records every paid-status push instead of calling a platform.
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { calls: Mutex::new(Vec::new()), fail: true }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PlatformNotifier for RecordingNotifier {
    async fn mark_paid(&self, order_id: &str) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(order_id.to_string());
        if self.fail {
            return Err(PlatformError::Rejected { status: "422 Unprocessable Entity".into() });
        }
        Ok(())
    }
}

pub fn router_with(config: RelayConfig, notifier: Arc<RecordingNotifier>) -> Router {
    let state = AppState::new(config, notifier).expect("app state");
    build_router(state)
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}
