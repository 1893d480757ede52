//! Shared application state threaded through every handler.

use std::sync::Arc;

use anyhow::Context;
use ckt_config::Settings;
use ckt_processor::Processor;
use ckt_telemetry::Telemetry;

/// Service name stamped onto telemetry resources and the health body.
pub const SERVICE_NAME: &str = "checkout-gateway";

/// Everything a handler needs, behind one `Arc`.
pub struct AppState {
    pub settings: Settings,
    pub telemetry: Telemetry,
    /// Payment processor seam; the binary installs the live reqwest adapter,
    /// tests install mocks.
    pub processor: Arc<dyn Processor>,
    /// Client used to forward browser telemetry to the collector.
    pub relay: reqwest::Client,
}

impl AppState {
    pub fn new(
        settings: Settings,
        telemetry: Telemetry,
        processor: Arc<dyn Processor>,
    ) -> anyhow::Result<Self> {
        let relay = reqwest::Client::builder()
            .timeout(settings.proxy_timeout)
            .build()
            .context("building collector relay client")?;
        Ok(Self {
            settings,
            telemetry,
            processor,
            relay,
        })
    }
}
