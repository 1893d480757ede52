//! Request/response bodies for the gateway's own endpoints.
//!
//! Processor order/capture responses are NOT modelled here: those pass
//! through to the browser verbatim as `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `GET /clientid`. The id is the public SDK identifier, or the
/// literal `"not_set"` when no credential is configured.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientIdResponse {
    pub clientid: String,
}

/// Body of `POST /orders`. The cart is accepted and counted but not priced;
/// unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub cart: Vec<Value>,
}

/// Acknowledgement for a proxied telemetry forward. The collector's own
/// response body is discarded; only its status travels back.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProxyAck {
    pub status: &'static str,
    pub target_status: u16,
    pub message: &'static str,
}

/// Body answered to every CORS preflight under `/proxy/v1/`.
#[derive(Debug, Serialize)]
pub struct PreflightAck {
    pub status: &'static str,
}

/// Body of `GET /health`. Always 200; liveness only, no dependency checks.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// Unix timestamp in fractional seconds.
    pub timestamp: f64,
    pub otel_endpoint: String,
}

/// Uniform error body. `detail` carries a fixed per-endpoint message for
/// business failures, never the internal error text.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}
