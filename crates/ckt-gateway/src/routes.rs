//! Route table and HTTP handlers.
//!
//! The three business endpoints (`/clientid`, `/orders`, `/capture/{id}`)
//! run through the [`observe::observed`] envelope. The proxy endpoints
//! relay raw OTLP payloads from the browser to the collector. Anything that
//! matches no route falls through to the static frontend bundle.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, options, post};
use axum::{Json, Router};
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::KeyValue;
use tower_http::services::ServeDir;

use crate::api_types::{
    ClientIdResponse, CreateOrderRequest, ErrorDetail, HealthResponse, PreflightAck, ProxyAck,
};
use crate::observe::{observed, Outcome};
use crate::state::{AppState, SERVICE_NAME};

/// Currency for every order.
const ORDER_CURRENCY: &str = "USD";
/// Placeholder order amount.
// TODO: price the order from the cart once the frontend sends line amounts.
const PLACEHOLDER_AMOUNT: &str = "100";

mod ops {
    use crate::observe::Op;

    pub const CLIENTID: Op = Op {
        name: "get_clientid",
        endpoint: "/clientid",
        method: "GET",
        failure_detail: "Internal server error",
        failure_order_status: None,
    };

    pub const CREATE_ORDER: Op = Op {
        name: "create_order",
        endpoint: "/orders",
        method: "POST",
        failure_detail: "Failed to create order",
        failure_order_status: Some("failed"),
    };

    pub const CAPTURE_ORDER: Op = Op {
        name: "capture_order",
        endpoint: "/capture",
        method: "POST",
        failure_detail: "Failed to capture order",
        failure_order_status: Some("capture_failed"),
    };
}

/// Build the gateway router. Middleware (CORS, request tracing) is attached
/// by the binary; tests drive this router bare.
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.settings.static_dir.clone();
    Router::new()
        .route("/clientid", get(clientid))
        .route("/orders", post(create_order))
        .route("/capture/:order_id", post(capture_order))
        // OPTIONS is registered on the literal proxy routes too: the router
        // prefers a static match, so the wildcard alone would leave the two
        // POST routes answering preflight with 405.
        .route(
            "/proxy/v1/traces",
            post(proxy_traces).options(proxy_preflight),
        )
        .route(
            "/proxy/v1/metrics",
            post(proxy_metrics).options(proxy_preflight),
        )
        .route("/proxy/v1/*path", options(proxy_preflight))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

async fn clientid(State(state): State<Arc<AppState>>) -> Response {
    observed(&state.telemetry, ops::CLIENTID, async {
        tracing::info!("fetching processor client id");
        let configured = state.settings.client_id_configured();
        let clientid = if configured {
            state.settings.processor_client_id.clone()
        } else {
            "not_set".to_string()
        };
        tracing::info!(configured, "client id configuration served");
        Ok(Outcome::new(Json(ClientIdResponse { clientid }))
            .attr("client_id_configured", configured))
    })
    .await
}

async fn create_order(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    observed(&state.telemetry, ops::CREATE_ORDER, async {
        // Parsed inside the business step so an unreadable body takes the
        // same error path (and fixed 500 body) as a processor failure.
        let request: CreateOrderRequest = serde_json::from_slice(&body)?;
        let cart_items = request.cart.len();
        let cart_json = cart_dump(&request.cart);
        tracing::info!(cart_items, "creating processor order");

        let order = state
            .processor
            .create_order(ORDER_CURRENCY, PLACEHOLDER_AMOUNT)
            .await?;
        let order_id = order.id().to_string();
        tracing::info!(order_id = %order_id, "order created");

        Ok(Outcome::new(Json(order.body))
            .attr("cart.item_count", cart_items as i64)
            .attr("cart.items", cart_json)
            .attr("order.amount", PLACEHOLDER_AMOUNT)
            .attr("order.currency", ORDER_CURRENCY)
            .attr("order.id", order_id)
            .count_order([
                KeyValue::new("status", "created"),
                KeyValue::new("amount", PLACEHOLDER_AMOUNT),
            ]))
    })
    .await
}

async fn capture_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Response {
    observed(&state.telemetry, ops::CAPTURE_ORDER, async {
        tracing::info!(order_id = %order_id, "capturing order");

        let order = state.processor.capture_order(&order_id).await?;
        let summary = order.capture_summary();
        tracing::info!(
            order_id = %order_id,
            transaction_id = %summary.transaction_id,
            status = %summary.status,
            "order captured"
        );

        Ok(Outcome::new(Json(order.body))
            .attr("order.id", order_id)
            .attr("capture.status", summary.status)
            .attr("capture.amount", summary.amount.clone())
            .attr("transaction.id", summary.transaction_id)
            .count_order([
                KeyValue::new("status", "captured"),
                KeyValue::new("amount", summary.amount),
            ]))
    })
    .await
}

/// Which OTLP signal a proxied request carries.
#[derive(Debug, Clone, Copy)]
enum TelemetrySignal {
    Traces,
    Metrics,
}

impl TelemetrySignal {
    fn span_name(self) -> &'static str {
        match self {
            TelemetrySignal::Traces => "proxy_traces",
            TelemetrySignal::Metrics => "proxy_metrics",
        }
    }

    fn label(self) -> &'static str {
        match self {
            TelemetrySignal::Traces => "traces",
            TelemetrySignal::Metrics => "metrics",
        }
    }

    fn path(self) -> &'static str {
        match self {
            TelemetrySignal::Traces => "/v1/traces",
            TelemetrySignal::Metrics => "/v1/metrics",
        }
    }

    fn ack_message(self) -> &'static str {
        match self {
            TelemetrySignal::Traces => "Traces forwarded to OTel collector",
            TelemetrySignal::Metrics => "Metrics forwarded to OTel collector",
        }
    }
}

async fn proxy_traces(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    relay_to_collector(&state, TelemetrySignal::Traces, &headers, body).await
}

async fn proxy_metrics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    relay_to_collector(&state, TelemetrySignal::Metrics, &headers, body).await
}

/// Forward one browser OTLP payload to the collector, byte for byte.
///
/// Only content-type and accept travel with it (defaulted when the browser
/// omits them); the ack carries the collector's status but not its body.
/// Unlike the business handlers, a failure here leaks the transport error
/// into `detail` so the frontend console shows what broke.
async fn relay_to_collector(
    state: &AppState,
    signal: TelemetrySignal,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let mut span = state.telemetry.tracer.start(signal.span_name());
    span.set_attribute(KeyValue::new("proxy.type", signal.label()));
    span.set_attribute(KeyValue::new("proxy.target", "otel_collector"));

    let url = format!(
        "{}{}",
        state.settings.collector_base_url.trim_end_matches('/'),
        signal.path()
    );
    let content_type = header_or(headers, "content-type", "application/json");
    let accept = header_or(headers, "accept", "*/*");

    let forwarded: Result<(u16, usize), reqwest::Error> = async {
        let response = state
            .relay
            .post(&url)
            .header("Content-Type", content_type)
            .header("Accept", accept)
            .body(body)
            .send()
            .await?;
        let target_status = response.status().as_u16();
        let response_size = response.bytes().await.map(|b| b.len()).unwrap_or(0);
        Ok((target_status, response_size))
    }
    .await;

    match forwarded {
        Ok((target_status, response_size)) => {
            span.set_attribute(KeyValue::new("proxy.status_code", i64::from(target_status)));
            span.set_attribute(KeyValue::new("proxy.response_size", response_size as i64));
            span.end();
            tracing::info!(
                signal = signal.label(),
                target_status,
                "proxied telemetry request"
            );
            Json(ProxyAck {
                status: "forwarded",
                target_status,
                message: signal.ack_message(),
            })
            .into_response()
        }
        Err(err) => {
            span.record_error(&err);
            span.set_attribute(KeyValue::new("proxy.error", err.to_string()));
            span.end();
            tracing::error!(signal = signal.label(), error = %err, "telemetry proxy failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorDetail {
                    detail: format!("Proxy error: {err}"),
                }),
            )
                .into_response()
        }
    }
}

/// JSON rendering of the cart for the `cart.items` span attribute.
fn cart_dump(cart: &[serde_json::Value]) -> String {
    serde_json::Value::Array(cart.to_vec()).to_string()
}

fn header_or(headers: &HeaderMap, name: &str, default: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(default)
        .to_string()
}

async fn proxy_preflight() -> Json<PreflightAck> {
    Json(PreflightAck { status: "ok" })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut span = state.telemetry.tracer.start("health_check");
    span.set_attribute(KeyValue::new("health.status", "ok"));
    span.end();
    tracing::info!("health check requested");
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: chrono::Utc::now().timestamp_micros() as f64 / 1e6,
        otel_endpoint: state.settings.collector_base_url.clone(),
    })
}
