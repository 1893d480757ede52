//! ckt-config
//!
//! Environment-driven settings for the checkout gateway. Everything is read
//! once at process start; nothing here re-reads the environment afterwards.
//!
//! Credentials resolve fail-soft: a missing processor client id/secret comes
//! through as an empty string and only surfaces as an error when the
//! processor adapter rejects the call. This keeps the gateway bootable for
//! local demo work (clientid returns its sentinel, health stays green).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on a single processor call (token fetch or order/capture).
pub const DEFAULT_PROCESSOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on one proxied forward to the telemetry collector.
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8000);
const DEFAULT_PROCESSOR_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
const DEFAULT_COLLECTOR_BASE_URL: &str = "http://localhost:4318";

/// Resolved gateway settings.
///
/// Fields are plain values so tests can build a `Settings` literal without
/// touching the process environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Listen address for the HTTP server.
    pub bind_addr: SocketAddr,
    /// Directory the demo frontend bundle is served from.
    pub static_dir: PathBuf,
    /// Public client identifier handed to the browser SDK. Empty = unset.
    pub processor_client_id: String,
    /// OAuth client secret for the processor. Empty = unset.
    pub processor_client_secret: String,
    /// Base URL of the payment processor's REST API.
    pub processor_base_url: String,
    /// Base URL of the telemetry collector; signal sub-paths are derived
    /// from it (`/v1/traces`, `/v1/metrics`, `/v1/logs`).
    pub collector_base_url: String,
    /// Deployment environment tag stamped onto telemetry resources.
    pub environment: String,
    /// Service instance id stamped onto telemetry resources.
    pub instance_id: String,
    /// Timeout applied to every processor call.
    pub processor_timeout: Duration,
    /// Timeout applied to every proxied collector forward.
    pub proxy_timeout: Duration,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an injected lookup. Tests use this to avoid
    /// mutating process-global environment state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        // An unparseable address falls back to the default silently; the
        // bound address is logged at startup either way.
        let bind_addr = get("CKT_ADDR")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.bind_addr);

        Self {
            bind_addr,
            static_dir: get("CKT_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            processor_client_id: get("PROCESSOR_CLIENT_ID").unwrap_or_default(),
            processor_client_secret: get("PROCESSOR_CLIENT_SECRET").unwrap_or_default(),
            processor_base_url: get("PROCESSOR_BASE_URL").unwrap_or(defaults.processor_base_url),
            collector_base_url: get("OTEL_ENDPOINT").unwrap_or(defaults.collector_base_url),
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            instance_id: get("HOSTNAME").unwrap_or(defaults.instance_id),
            processor_timeout: defaults.processor_timeout,
            proxy_timeout: defaults.proxy_timeout,
        }
    }

    /// Whether a non-empty processor client id is configured.
    pub fn client_id_configured(&self) -> bool {
        !self.processor_client_id.is_empty()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(DEFAULT_BIND_ADDR),
            static_dir: PathBuf::from("."),
            processor_client_id: String::new(),
            processor_client_secret: String::new(),
            processor_base_url: DEFAULT_PROCESSOR_BASE_URL.to_string(),
            collector_base_url: DEFAULT_COLLECTOR_BASE_URL.to_string(),
            environment: "development".to_string(),
            instance_id: "localhost".to_string(),
            processor_timeout: DEFAULT_PROCESSOR_TIMEOUT,
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
        }
    }
}
