//! ckt-processor
//!
//! REST adapter for the external payment processor. The gateway only ever
//! needs two calls — create a capture-intent order and capture it — so the
//! whole processor surface is folded behind the [`Processor`] trait and one
//! reqwest-backed implementation.
//!
//! The adapter does not retry and is not idempotent at this layer;
//! duplicate-capture protection is the processor's own responsibility.
//! Responses are passed through verbatim (`OrderResult::body`) with tolerant
//! accessors for the handful of fields the gateway reads, because the
//! processor's response schema varies across account configurations.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Errors a processor call may surface.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Client id/secret missing. Configuration resolves fail-soft, so this
    /// only shows up once a call is actually attempted.
    #[error("processor credentials are not configured")]
    Credentials,
    /// Network-level failure reaching the processor.
    #[error("processor transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The processor answered with a non-success status. The body is kept
    /// opaque; business-rule rejections (already captured, insufficient
    /// funds, unknown order id) all land here.
    #[error("processor rejected the request: http {status}: {body}")]
    Rejected { status: u16, body: String },
    /// The processor answered 2xx but the payload was not decodable JSON.
    #[error("processor returned a malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),
}

impl ProcessorError {
    /// Stable error-type label used on error counters and span attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessorError::Credentials => "configuration",
            ProcessorError::Transport(_) => "transport",
            ProcessorError::Rejected { .. } => "rejected",
            ProcessorError::Malformed(_) => "malformed",
        }
    }
}

/// Summary of the first capture inside an order response.
///
/// Every field defaults to a sentinel when the processor omits the nested
/// structure; callers must not assume the full shape is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    pub status: String,
    pub amount: String,
    pub transaction_id: String,
}

impl Default for CaptureSummary {
    fn default() -> Self {
        Self {
            status: "unknown".to_string(),
            amount: "0".to_string(),
            transaction_id: "unknown".to_string(),
        }
    }
}

/// Raw processor order/capture response.
#[derive(Debug, Clone)]
pub struct OrderResult {
    /// Verbatim response body; handlers return this to the browser untouched.
    pub body: Value,
}

impl OrderResult {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Order identifier, or `"unknown"` when absent.
    pub fn id(&self) -> &str {
        self.body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }

    /// Walk `purchase_units[0].payments.captures[0]`, defaulting each field
    /// that is missing along the way.
    pub fn capture_summary(&self) -> CaptureSummary {
        let mut summary = CaptureSummary::default();
        let capture = self
            .body
            .pointer("/purchase_units/0/payments/captures/0");
        let Some(capture) = capture else {
            return summary;
        };
        if let Some(status) = capture.get("status").and_then(Value::as_str) {
            summary.status = status.to_string();
        }
        if let Some(id) = capture.get("id").and_then(Value::as_str) {
            summary.transaction_id = id.to_string();
        }
        if let Some(amount) = capture.pointer("/amount/value").and_then(Value::as_str) {
            summary.amount = amount.to_string();
        }
        summary
    }
}

/// Payment-processor contract the gateway handlers call through.
///
/// Object-safe and `Send + Sync` so `AppState` can hold an
/// `Arc<dyn Processor>` and tests can swap in a mock.
#[async_trait::async_trait]
pub trait Processor: Send + Sync {
    /// Submit a capture-intent order with one purchase unit.
    async fn create_order(&self, currency: &str, amount: &str)
        -> Result<OrderResult, ProcessorError>;

    /// Capture the full amount of a previously created order, requesting
    /// the full representation back.
    async fn capture_order(&self, order_id: &str) -> Result<OrderResult, ProcessorError>;
}

/// Connection parameters for the live adapter.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Bound on each individual HTTP call (token fetch, order, capture).
    pub timeout: Duration,
}

/// Live reqwest-backed processor adapter.
#[derive(Debug, Clone)]
pub struct ProcessorClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

// Outbound wire types. Only what the gateway sends; the processor's full
// order schema is never modelled because responses pass through verbatim.

#[derive(Debug, Serialize)]
struct OrderPayload {
    intent: &'static str,
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit {
    amount: MoneyAmount,
}

#[derive(Debug, Serialize)]
struct MoneyAmount {
    currency_code: String,
    value: String,
}

impl OrderPayload {
    fn capture(currency: &str, amount: &str) -> Self {
        Self {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnit {
                amount: MoneyAmount {
                    currency_code: currency.to_string(),
                    value: amount.to_string(),
                },
            }],
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ProcessorClient {
    pub fn new(cfg: ProcessorConfig) -> Result<Self, ProcessorError> {
        let http = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client_id: cfg.client_id,
            client_secret: cfg.client_secret,
        })
    }

    /// Fetch a client-credentials access token. No caching: each gateway
    /// request performs exactly one token fetch, keeping the adapter free
    /// of shared mutable state.
    async fn access_token(&self) -> Result<String, ProcessorError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ProcessorError::Credentials);
        }

        let resp = self
            .http
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let body = Self::success_body(resp).await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(ProcessorError::Malformed)?;
        Ok(token.access_token)
    }

    /// Resolve a response into its body text, mapping non-success statuses
    /// to `Rejected`.
    async fn success_body(resp: reqwest::Response) -> Result<String, ProcessorError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ProcessorError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn parse_order(body: &str) -> Result<OrderResult, ProcessorError> {
        let value: Value = serde_json::from_str(body).map_err(ProcessorError::Malformed)?;
        Ok(OrderResult::new(value))
    }
}

#[async_trait::async_trait]
impl Processor for ProcessorClient {
    async fn create_order(
        &self,
        currency: &str,
        amount: &str,
    ) -> Result<OrderResult, ProcessorError> {
        let token = self.access_token().await?;

        let resp = self
            .http
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(token)
            .json(&OrderPayload::capture(currency, amount))
            .send()
            .await?;

        let body = Self::success_body(resp).await?;
        Self::parse_order(&body)
    }

    async fn capture_order(&self, order_id: &str) -> Result<OrderResult, ProcessorError> {
        let token = self.access_token().await?;

        let resp = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url, order_id
            ))
            .bearer_auth(token)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let body = Self::success_body(resp).await?;
        Self::parse_order(&body)
    }
}

// -----------------
// Tests (no network)
// -----------------
