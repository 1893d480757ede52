//! Scenario: order create/capture endpoints.
//!
//! # Invariants under test
//!
//! 1. `/orders` always submits the fixed USD placeholder amount, whatever
//!    the cart contains.
//! 2. Processor responses pass through to the caller verbatim.
//! 3. Every failure (bad body, processor rejection) collapses to the
//!    endpoint's fixed 500 detail; internal error text never leaks.

use std::sync::{Arc, Mutex};

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

use ckt_config::Settings;
use ckt_gateway::routes::build_router;
use ckt_gateway::state::AppState;
use ckt_processor::{OrderResult, Processor, ProcessorError};
use ckt_telemetry::Telemetry;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Scripted processor: records calls, answers with a canned body or a
/// rejection when no body is scripted.
struct ScriptedProcessor {
    create_body: Option<Value>,
    capture_body: Option<Value>,
    create_calls: Mutex<Vec<(String, String)>>,
    capture_calls: Mutex<Vec<String>>,
}

impl ScriptedProcessor {
    fn new(create_body: Option<Value>, capture_body: Option<Value>) -> Arc<Self> {
        Arc::new(Self {
            create_body,
            capture_body,
            create_calls: Mutex::new(Vec::new()),
            capture_calls: Mutex::new(Vec::new()),
        })
    }

    fn rejection() -> ProcessorError {
        ProcessorError::Rejected {
            status: 500,
            body: r#"{"name":"INTERNAL_SERVICE_ERROR"}"#.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Processor for ScriptedProcessor {
    async fn create_order(
        &self,
        currency: &str,
        amount: &str,
    ) -> Result<OrderResult, ProcessorError> {
        self.create_calls
            .lock()
            .unwrap()
            .push((currency.to_string(), amount.to_string()));
        match &self.create_body {
            Some(body) => Ok(OrderResult::new(body.clone())),
            None => Err(Self::rejection()),
        }
    }

    async fn capture_order(&self, order_id: &str) -> Result<OrderResult, ProcessorError> {
        self.capture_calls.lock().unwrap().push(order_id.to_string());
        match &self.capture_body {
            Some(body) => Ok(OrderResult::new(body.clone())),
            None => Err(Self::rejection()),
        }
    }
}

fn make_router(processor: Arc<ScriptedProcessor>) -> axum::Router {
    let state = AppState::new(Settings::default(), Telemetry::disabled(), processor)
        .expect("state build");
    build_router(Arc::new(state))
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn post(uri: &str, body: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_order_submits_the_placeholder_amount_regardless_of_cart() {
    let order_body = json!({ "id": "5O190127TN364715T", "status": "CREATED" });
    let processor = ScriptedProcessor::new(Some(order_body.clone()), None);
    let router = make_router(Arc::clone(&processor));

    let cart = json!({ "cart": [
        { "id": "sku-1", "quantity": 2, "price": "9999.99" },
        { "id": "sku-2", "quantity": 1 }
    ] });
    let (status, body) = call(router, post("/orders", &cart.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    // Processor body passes through untouched.
    assert_eq!(parse_json(body), order_body);
    // Cart contents never influence the submitted amount.
    assert_eq!(
        *processor.create_calls.lock().unwrap(),
        vec![("USD".to_string(), "100".to_string())]
    );
}

#[tokio::test]
async fn create_order_tolerates_a_missing_cart_field() {
    let processor = ScriptedProcessor::new(Some(json!({ "id": "ord-1" })), None);
    let router = make_router(Arc::clone(&processor));

    let (status, _) = call(router, post("/orders", "{}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(processor.create_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn create_order_unreadable_body_is_the_fixed_500() {
    let processor = ScriptedProcessor::new(Some(json!({ "id": "ord-1" })), None);
    let router = make_router(Arc::clone(&processor));

    let (status, body) = call(router, post("/orders", "not-json{{")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_json(body), json!({ "detail": "Failed to create order" }));
    // The processor is never reached on a bad body.
    assert!(processor.create_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_order_processor_failure_never_leaks_detail() {
    let processor = ScriptedProcessor::new(None, None);
    let router = make_router(processor);

    let (status, body) = call(router, post("/orders", r#"{"cart":[]}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // Exactly the fixed detail; the processor's INTERNAL_SERVICE_ERROR body
    // stays server-side.
    assert_eq!(parse_json(body), json!({ "detail": "Failed to create order" }));
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[tokio::test]
async fn capture_order_routes_the_path_id_and_passes_the_body_through() {
    let capture_body = json!({
        "id": "5O190127TN364715T",
        "status": "COMPLETED",
        "purchase_units": [{
            "payments": { "captures": [{
                "id": "3C679366HH908993F",
                "status": "COMPLETED",
                "amount": { "currency_code": "USD", "value": "100.00" }
            }] }
        }]
    });
    let processor = ScriptedProcessor::new(None, Some(capture_body.clone()));
    let router = make_router(Arc::clone(&processor));

    let (status, body) = call(router, post("/capture/5O190127TN364715T", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body), capture_body);
    assert_eq!(
        *processor.capture_calls.lock().unwrap(),
        vec!["5O190127TN364715T".to_string()]
    );
}

#[tokio::test]
async fn capture_order_failure_is_the_fixed_500() {
    let processor = ScriptedProcessor::new(None, None);
    let router = make_router(processor);

    let (status, body) = call(router, post("/capture/already-captured", "")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        parse_json(body),
        json!({ "detail": "Failed to capture order" })
    );
}
