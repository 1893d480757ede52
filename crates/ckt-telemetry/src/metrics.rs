//! Custom metric instruments shared by every gateway handler.
//!
//! Key metrics:
//! - checkout_requests_total: counter for inbound API requests
//! - checkout_request_duration_seconds: histogram for request latency
//! - checkout_orders_total: counter for order lifecycle outcomes
//! - checkout_errors_total: counter for handler failures

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Checkout gateway metrics registry.
///
/// Instruments accept free-form label sets at record time (endpoint, method,
/// status, error_type, amount); nothing is pre-aggregated here.
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Total inbound requests, labelled by endpoint and method.
    pub requests_total: Counter<u64>,
    /// Request latency in seconds, labelled by endpoint, method and status.
    pub request_duration_seconds: Histogram<f64>,
    /// Order lifecycle outcomes (created / captured / failed / capture_failed).
    pub orders_total: Counter<u64>,
    /// Handler failures, labelled by endpoint and error_type.
    pub errors_total: Counter<u64>,
}

impl Metrics {
    /// Create the instrument set from a meter.
    pub fn new(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("checkout_requests_total")
                .with_description("Total number of checkout API requests")
                .with_unit("1")
                .init(),
            request_duration_seconds: meter
                .f64_histogram("checkout_request_duration_seconds")
                .with_description("Duration of checkout API requests in seconds")
                .with_unit("s")
                .init(),
            orders_total: meter
                .u64_counter("checkout_orders_total")
                .with_description("Total number of processor orders by outcome")
                .with_unit("1")
                .init(),
            errors_total: meter
                .u64_counter("checkout_errors_total")
                .with_description("Total number of checkout handler errors")
                .with_unit("1")
                .init(),
        }
    }
}
