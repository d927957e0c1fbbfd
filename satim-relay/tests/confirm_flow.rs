mod support;

use std::sync::Arc;

use axum::http::StatusCode;
use httpmock::prelude::*;
use reqwest::Client;
use satim_relay::config::ShopifyConfig;
use satim_relay::{PlatformError, PlatformNotifier, ShopifyNotifier};
use serde_json::json;
use support::{get, router_with, test_config, RecordingNotifier};

#[tokio::test]
async fn paid_order_notifies_platform_once() {
    let server = MockServer::start_async().await;
    let confirm = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/payment/rest/confirmOrder.do")
                .query_param("orderId", "gw-1")
                .query_param("userName", "SAT2301160955")
                .query_param("password", "satim120")
                .query_param("language", "FR");
            then.status(200).json_body(json!({
                "ErrorCode": "0",
                "OrderStatus": 2,
                "OrderNumber": "6226655478074",
                "ErrorMessage": "Success"
            }));
        })
        .await;
    let notifier = Arc::new(RecordingNotifier::default());
    let app = router_with(test_config(&server, &[]), notifier.clone());

    let (status, body) = get(app, "/success?orderId=gw-1").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("Payment successful"), "{body}");
    assert_eq!(notifier.calls(), vec!["6226655478074".to_string()]);
    confirm.assert_hits_async(1).await;
}

#[tokio::test]
async fn order_number_falls_back_to_udf1_echo() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/payment/rest/confirmOrder.do");
            then.status(200).json_body(json!({"errorCode": 0, "orderStatus": 2, "params": {"udf1": "998877"}}));
        })
        .await;
    let notifier = Arc::new(RecordingNotifier::default());
    let app = router_with(test_config(&server, &[]), notifier.clone());

    let (status, _) = get(app, "/success?orderId=gw-2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notifier.calls(), vec!["998877".to_string()]);
}

#[tokio::test]
async fn unpaid_order_does_not_notify() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/payment/rest/confirmOrder.do");
            then.status(200).json_body(json!({
                "ErrorCode": "0",
                "OrderStatus": 1,
                "OrderNumber": "123",
                "actionCodeDescription": "Insufficient funds"
            }));
        })
        .await;
    let notifier = Arc::new(RecordingNotifier::default());
    let app = router_with(test_config(&server, &[]), notifier.clone());

    let (status, body) = get(app, "/success?orderId=gw-3").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Payment failed"), "{body}");
    assert!(body.contains("Insufficient funds"), "{body}");
    assert!(notifier.calls().is_empty());
}

#[tokio::test]
async fn declined_card_is_a_failed_payment_not_an_error() {
    let server = MockServer::start_async().await;
    let confirm = server
        .mock_async(|when, then| {
            when.method(GET).path("/payment/rest/confirmOrder.do").query_param("orderId", "gw-d");
            then.status(200).json_body(json!({
                "ErrorCode": "2",
                "ErrorMessage": "Payment is declined",
                "OrderStatus": 6,
                "OrderNumber": "123"
            }));
        })
        .await;
    let notifier = Arc::new(RecordingNotifier::default());
    let app = router_with(test_config(&server, &[]), notifier.clone());

    let (status, body) = get(app, "/success?orderId=gw-d").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("Payment failed"), "{body}");
    assert!(body.contains("Payment is declined"), "{body}");
    assert!(notifier.calls().is_empty());
    confirm.assert_hits_async(1).await;
}

#[tokio::test]
async fn missing_order_id_is_rejected_without_gateway_call() {
    let server = MockServer::start_async().await;
    let confirm = server
        .mock_async(|when, then| {
            when.method(GET).path("/payment/rest/confirmOrder.do");
            then.status(200).json_body(json!({"errorCode": 0, "orderStatus": 2}));
        })
        .await;
    let notifier = Arc::new(RecordingNotifier::default());
    let app = router_with(test_config(&server, &[]), notifier.clone());

    let (status, body) = get(app, "/success").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("missing_order_id"), "{body}");
    confirm.assert_hits_async(0).await;
    assert!(notifier.calls().is_empty());
}

#[tokio::test]
async fn gateway_status_error_is_a_business_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/payment/rest/confirmOrder.do");
            then.status(200).json_body(json!({"ErrorCode": "6", "ErrorMessage": "Unknown order"}));
        })
        .await;
    let notifier = Arc::new(RecordingNotifier::default());
    let app = router_with(test_config(&server, &[]), notifier.clone());

    let (status, body) = get(app, "/success?orderId=nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("gateway_rejected"), "{body}");
    assert!(notifier.calls().is_empty());
}

#[tokio::test]
async fn platform_failure_surfaces_as_internal_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/payment/rest/confirmOrder.do");
            then.status(200).json_body(json!({"errorCode": 0, "orderStatus": 2, "orderNumber": "55"}));
        })
        .await;
    let notifier = Arc::new(RecordingNotifier::failing());
    let app = router_with(test_config(&server, &[]), notifier.clone());

    let (status, body) = get(app, "/success?orderId=gw-55").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("platform_update_failed"), "{body}");
    assert_eq!(notifier.calls().len(), 1);
}

#[tokio::test]
async fn failure_redirect_always_answers_ok() {
    let server = MockServer::start_async().await;
    let config = test_config(&server, &[]);
    for uri in ["/failure?orderId=gw-7", "/failure"] {
        let notifier = Arc::new(RecordingNotifier::default());
        let app = router_with(config.clone(), notifier.clone());
        let (status, body) = get(app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Payment failed"), "{body}");
        assert!(notifier.calls().is_empty());
    }
}

fn shopify(server: &MockServer) -> ShopifyNotifier {
    ShopifyNotifier::new(
        Client::new(),
        ShopifyConfig {
            api_base_url: server.base_url(),
            api_version: "2024-01".into(),
            access_token: "shpat_test".into(),
        },
    )
}

#[tokio::test]
async fn shopify_notifier_puts_paid_status() {
    let server = MockServer::start_async().await;
    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/admin/api/2024-01/orders/6226655478074.json")
                .header("X-Shopify-Access-Token", "shpat_test")
                .json_body(json!({"order": {"id": 6226655478074u64, "financial_status": "paid"}}));
            then.status(200).json_body(json!({"order": {"id": 6226655478074u64}}));
        })
        .await;

    shopify(&server).mark_paid("6226655478074").await.unwrap();
    update.assert_hits_async(1).await;
}

#[tokio::test]
async fn shopify_notifier_reports_rejections() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/admin/api/2024-01/orders/1.json");
            then.status(404);
        })
        .await;

    match shopify(&server).mark_paid("1").await {
        Err(PlatformError::Rejected { status }) => assert_eq!(status, "404 Not Found"),
        other => panic!("unexpected {other:?}"),
    }
}
