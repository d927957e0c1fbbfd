use common_http_errors::ApiError;
use axum::response::IntoResponse;
use axum::http::StatusCode;
use axum::body::to_bytes;

#[test]
fn bad_request_variant() {
    let err = ApiError::BadRequest { code: "invalid_price", message: None };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_price");
}

#[test]
fn unauthorized_variant() {
    let err = ApiError::Unauthorized { code: "invalid_signature" };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_signature");
}

#[test]
fn not_found_variant() {
    let err = ApiError::NotFound { code: "missing_resource" };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "missing_resource");
}

#[test]
fn bad_gateway_variant() {
    let err = ApiError::bad_gateway("gateway_unavailable", "connection refused");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "gateway_unavailable");
}

#[tokio::test]
async fn internal_variant_carries_message() {
    let err = ApiError::internal("boom");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
    let bytes = to_bytes(resp.into_body(), 1024).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains("\"code\":\"internal_error\""), "unexpected body: {}", body);
    assert!(body.contains("\"message\":\"boom\""), "unexpected body: {}", body);
}

#[tokio::test]
async fn message_omitted_when_absent() {
    let resp = ApiError::Unauthorized { code: "invalid_signature" }.into_response();
    let bytes = to_bytes(resp.into_body(), 1024).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(body, "{\"code\":\"invalid_signature\"}");
}
