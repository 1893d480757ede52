//! ckt-gateway
//!
//! Checkout backend facade: serves the demo frontend bundle, exposes the
//! order/capture API over the payment processor, and proxies browser
//! telemetry to the OTel collector so the frontend never talks to it
//! cross-origin.
//!
//! The binary lives in `main.rs`; everything else is library so scenario
//! tests can drive the router in-process.

pub mod api_types;
pub mod observe;
pub mod routes;
pub mod state;
