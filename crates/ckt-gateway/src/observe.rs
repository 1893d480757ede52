//! The per-handler observation envelope.
//!
//! Every business endpoint runs inside [`observed`]: open a span named after
//! the handler, count the request, run the business future, then stamp
//! success attributes or error attributes/counters and record the latency.
//! Failures collapse to one fixed 500 body per endpoint; the real error text
//! only ever reaches logs and spans.

use std::future::Future;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use opentelemetry::trace::{Span, Status, Tracer};
use opentelemetry::KeyValue;

use ckt_processor::ProcessorError;
use ckt_telemetry::Telemetry;

use crate::api_types::ErrorDetail;

/// What can go wrong inside a business step.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request body did not parse. Deliberately mapped to the endpoint's
    /// generic 500, not a 4xx: the caller sees the same fixed detail either
    /// way.
    #[error("request body is not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

impl GatewayError {
    /// Stable error-type label for counters and span attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidBody(_) => "invalid_body",
            GatewayError::Processor(err) => err.kind(),
        }
    }
}

/// Static description of one observed endpoint.
#[derive(Debug, Clone, Copy)]
pub struct Op {
    /// Span name.
    pub name: &'static str,
    /// Endpoint label on counters and spans, e.g. `/orders`.
    pub endpoint: &'static str,
    pub method: &'static str,
    /// Fixed `detail` string of the 500 body on failure.
    pub failure_detail: &'static str,
    /// Order-counter status recorded on failure, if this endpoint takes part
    /// in the order lifecycle.
    pub failure_order_status: Option<&'static str>,
}

/// Successful business outcome: the response value plus the span attributes
/// and order-counter labels to stamp on the way out.
pub struct Outcome<T> {
    value: T,
    attrs: Vec<KeyValue>,
    order_labels: Option<Vec<KeyValue>>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            attrs: Vec::new(),
            order_labels: None,
        }
    }

    /// Attach a span attribute to the success path.
    pub fn attr(mut self, key: &'static str, value: impl Into<opentelemetry::Value>) -> Self {
        self.attrs.push(KeyValue::new(key, value));
        self
    }

    /// Count this outcome on the order-lifecycle counter.
    pub fn count_order<I>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        self.order_labels = Some(labels.into_iter().collect());
        self
    }
}

/// Run one observed handler. All three business endpoints share this path;
/// they differ only in the business future and the attributes it returns.
pub async fn observed<T, Fut>(telemetry: &Telemetry, op: Op, business: Fut) -> Response
where
    T: IntoResponse,
    Fut: Future<Output = Result<Outcome<T>, GatewayError>>,
{
    let start = Instant::now();
    let mut span = telemetry.tracer.start(op.name);
    span.set_attribute(KeyValue::new("endpoint", op.endpoint));
    span.set_attribute(KeyValue::new("method", op.method));

    let metrics = &telemetry.metrics;
    metrics.requests_total.add(
        1,
        &[
            KeyValue::new("endpoint", op.endpoint),
            KeyValue::new("method", op.method),
        ],
    );

    match business.await {
        Ok(outcome) => {
            for attr in outcome.attrs {
                span.set_attribute(attr);
            }
            span.set_attribute(KeyValue::new("success", true));
            if let Some(labels) = outcome.order_labels {
                metrics.orders_total.add(1, &labels);
            }
            metrics.request_duration_seconds.record(
                start.elapsed().as_secs_f64(),
                &[
                    KeyValue::new("endpoint", op.endpoint),
                    KeyValue::new("method", op.method),
                    KeyValue::new("status", "success"),
                ],
            );
            span.end();
            outcome.value.into_response()
        }
        Err(err) => {
            span.record_error(&err);
            span.set_attribute(KeyValue::new("success", false));
            span.set_attribute(KeyValue::new("error.type", err.kind()));
            span.set_attribute(KeyValue::new("error.message", err.to_string()));
            span.set_status(Status::error(err.to_string()));

            metrics.errors_total.add(
                1,
                &[
                    KeyValue::new("endpoint", op.endpoint),
                    KeyValue::new("error_type", err.kind()),
                ],
            );
            if let Some(status) = op.failure_order_status {
                metrics
                    .orders_total
                    .add(1, &[KeyValue::new("status", status)]);
            }
            metrics.request_duration_seconds.record(
                start.elapsed().as_secs_f64(),
                &[
                    KeyValue::new("endpoint", op.endpoint),
                    KeyValue::new("method", op.method),
                    KeyValue::new("status", "error"),
                ],
            );

            tracing::error!(endpoint = op.endpoint, error = %err, "handler failed");
            span.end();

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorDetail {
                    detail: op.failure_detail.to_string(),
                }),
            )
                .into_response()
        }
    }
}
