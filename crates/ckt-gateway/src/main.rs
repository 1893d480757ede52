//! Checkout gateway binary.

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use ckt_config::Settings;
use ckt_gateway::routes::build_router;
use ckt_gateway::state::{AppState, SERVICE_NAME};
use ckt_processor::{ProcessorClient, ProcessorConfig};
use ckt_telemetry::{Telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let settings = Settings::from_env();

    let mut telemetry_cfg = TelemetryConfig::new(SERVICE_NAME, settings.collector_base_url.clone());
    telemetry_cfg.instance_id = settings.instance_id.clone();
    telemetry_cfg.environment = settings.environment.clone();
    let telemetry = Telemetry::init(&telemetry_cfg)?;
    ckt_telemetry::init_subscriber(&telemetry, "info,hyper=warn");

    if !settings.client_id_configured() {
        tracing::warn!(
            "processor credentials are not configured; order endpoints will fail until they are"
        );
    }

    let processor = Arc::new(ProcessorClient::new(ProcessorConfig {
        base_url: settings.processor_base_url.clone(),
        client_id: settings.processor_client_id.clone(),
        client_secret: settings.processor_client_secret.clone(),
        timeout: settings.processor_timeout,
    })?);

    let addr = settings.bind_addr;
    let state = Arc::new(AppState::new(settings, telemetry.clone(), processor)?);

    // The browser SDK and the demo frontend load from arbitrary origins, so
    // CORS stays permissive. Request tracing lives here rather than in
    // build_router so scenario tests drive the bare router.
    let app = build_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "checkout gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated")?;

    // Flush buffered spans/metrics/logs before the process exits.
    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
