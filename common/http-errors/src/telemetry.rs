use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Upper bound on distinct `code` label values before new codes collapse into `other`.
pub const MAX_ERROR_CODES: usize = 40;

static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    ).unwrap()
});

static HTTP_ERROR_CODES_DISTINCT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("http_error_codes_distinct", "Distinct error codes currently tracked as labels").unwrap()
});

static HTTP_ERROR_CODES_OVERFLOW: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("http_error_code_overflow_total", "Error responses whose code exceeded the label guard").unwrap()
});

static SEEN_CODES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Register the shared error collectors into a service registry. Safe to call for several registries.
pub fn register_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(HTTP_ERRORS_TOTAL.clone()))?;
    registry.register(Box::new(HTTP_ERROR_CODES_DISTINCT.clone()))?;
    registry.register(Box::new(HTTP_ERROR_CODES_OVERFLOW.clone()))?;
    Ok(())
}

fn guarded_code(code: &str) -> String {
    let mut seen = match SEEN_CODES.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if seen.contains(code) {
        return code.to_string();
    }
    if seen.len() >= MAX_ERROR_CODES {
        HTTP_ERROR_CODES_OVERFLOW.inc();
        return "other".to_string();
    }
    seen.insert(code.to_string());
    HTTP_ERROR_CODES_DISTINCT.set(seen.len() as i64);
    code.to_string()
}

pub fn record_error_code(service: &str, code: &str, status: &str) {
    let code = guarded_code(code);
    HTTP_ERRORS_TOTAL.with_label_values(&[service, &code, status]).inc();
}

pub fn distinct_error_codes() -> i64 { HTTP_ERROR_CODES_DISTINCT.get() }

pub fn overflow_count() -> u64 { HTTP_ERROR_CODES_OVERFLOW.get() }

pub fn error_count(service: &str, code: &str, status: &str) -> u64 {
    HTTP_ERRORS_TOTAL.with_label_values(&[service, code, status]).get()
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Middleware counting every response with status >= 400 under the `X-Error-Code` header value.
pub fn http_error_metrics_layer(
    service: &'static str,
) -> impl Fn(Request<Body>, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
    move |req: Request<Body>, next: Next| -> MiddlewareFuture {
        Box::pin(async move {
            let resp = next.run(req).await;
            let status = resp.status();
            if status.as_u16() >= 400 {
                let code = resp
                    .headers()
                    .get("X-Error-Code")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                record_error_code(service, code, status.as_str());
            }
            resp
        })
    }
}
