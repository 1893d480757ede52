//! HTTP-level scenario tests for the live processor adapter.
//!
//! A local httpmock server stands in for the processor; no real network
//! access is required.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use ckt_processor::{Processor, ProcessorClient, ProcessorConfig, ProcessorError};

fn client_for(server: &MockServer) -> ProcessorClient {
    ProcessorClient::new(ProcessorConfig {
        base_url: server.base_url(),
        client_id: "client-1".to_string(),
        client_secret: "secret-1".to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("client build")
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/oauth2/token")
                .header_exists("authorization");
            then.status(200)
                .json_body(json!({ "access_token": "test-token", "token_type": "Bearer" }));
        })
        .await
}

#[tokio::test]
async fn create_order_posts_capture_intent_and_passes_body_through() {
    let server = MockServer::start_async().await;
    let token = mock_token(&server).await;
    let order = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/checkout/orders")
                .header("authorization", "Bearer test-token")
                .json_body(json!({
                    "intent": "CAPTURE",
                    "purchase_units": [
                        { "amount": { "currency_code": "USD", "value": "100" } }
                    ]
                }));
            then.status(201).json_body(json!({
                "id": "5O190127TN364715T",
                "status": "CREATED",
                "links": [{ "rel": "approve", "href": "https://processor.example/approve" }]
            }));
        })
        .await;

    let client = client_for(&server);
    let result = client.create_order("USD", "100").await.expect("create");

    token.assert_async().await;
    order.assert_async().await;
    assert_eq!(result.id(), "5O190127TN364715T");
    assert_eq!(result.body["status"], "CREATED");
    // The body is a verbatim pass-through, extra fields included.
    assert_eq!(result.body["links"][0]["rel"], "approve");
}

#[tokio::test]
async fn capture_order_requests_full_representation() {
    let server = MockServer::start_async().await;
    let token = mock_token(&server).await;
    let capture = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/checkout/orders/5O190127TN364715T/capture")
                .header("authorization", "Bearer test-token")
                .header("prefer", "return=representation");
            then.status(201).json_body(json!({
                "id": "5O190127TN364715T",
                "status": "COMPLETED",
                "purchase_units": [{
                    "payments": {
                        "captures": [{
                            "id": "3C679366HH908993F",
                            "status": "COMPLETED",
                            "amount": { "currency_code": "USD", "value": "100.00" }
                        }]
                    }
                }]
            }));
        })
        .await;

    let client = client_for(&server);
    let result = client
        .capture_order("5O190127TN364715T")
        .await
        .expect("capture");

    token.assert_async().await;
    capture.assert_async().await;
    let summary = result.capture_summary();
    assert_eq!(summary.status, "COMPLETED");
    assert_eq!(summary.amount, "100.00");
    assert_eq!(summary.transaction_id, "3C679366HH908993F");
}

#[tokio::test]
async fn missing_credentials_fail_before_any_request() {
    let server = MockServer::start_async().await;
    // No mocks registered: any request hitting the server would 404 and
    // surface as Rejected, not Credentials.
    let client = ProcessorClient::new(ProcessorConfig {
        base_url: server.base_url(),
        client_id: String::new(),
        client_secret: String::new(),
        timeout: Duration::from_secs(5),
    })
    .expect("client build");

    let err = client.create_order("USD", "100").await.unwrap_err();
    assert!(matches!(err, ProcessorError::Credentials));
    assert_eq!(err.kind(), "configuration");
}

#[tokio::test]
async fn token_rejection_surfaces_as_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/oauth2/token");
            then.status(401)
                .json_body(json!({ "error": "invalid_client" }));
        })
        .await;

    let client = client_for(&server);
    let err = client.create_order("USD", "100").await.unwrap_err();
    match err {
        ProcessorError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid_client"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn business_rejection_surfaces_status_and_body() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v2/checkout/orders/already-captured/capture");
            then.status(422).json_body(json!({
                "name": "UNPROCESSABLE_ENTITY",
                "details": [{ "issue": "ORDER_ALREADY_CAPTURED" }]
            }));
        })
        .await;

    let client = client_for(&server);
    let err = client.capture_order("already-captured").await.unwrap_err();
    match err {
        ProcessorError::Rejected { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("ORDER_ALREADY_CAPTURED"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn undecodable_success_body_is_malformed() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v2/checkout/orders");
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let client = client_for(&server);
    let err = client.create_order("USD", "100").await.unwrap_err();
    assert!(matches!(err, ProcessorError::Malformed(_)));
    assert_eq!(err.kind(), "malformed");
}
