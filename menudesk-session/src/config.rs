//! Gateway configuration.

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "MENUDESK_API_BASE_URL";
pub const ENV_API_TIMEOUT_MS: &str = "MENUDESK_API_TIMEOUT_MS";
pub const ENV_REFRESH_TIMEOUT_MS: &str = "MENUDESK_REFRESH_TIMEOUT_MS";
pub const ENV_REPORT_ERRORS: &str = "MENUDESK_REPORT_ERRORS";

/// Configuration for the request gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL every request path is appended to (e.g., "https://admin.example.com/api/v1").
    pub api_base_url: String,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Upper bound on a token refresh round-trip, in milliseconds.
    pub refresh_timeout_ms: u64,

    /// Log terminal request failures at `warn` level.
    pub report_errors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/v1".to_string(),
            request_timeout_ms: 30_000,
            refresh_timeout_ms: 10_000,
            report_errors: false,
        }
    }
}

impl GatewayConfig {
    /// Defaults overlaid with `MENUDESK_*` environment variables.
    pub fn from_env() -> GatewayResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`. Unparseable numbers are
    /// configuration errors rather than silently falling back.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GatewayResult<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_BASE_URL) {
            config.api_base_url = url;
        }
        if let Some(ms) = lookup(ENV_API_TIMEOUT_MS) {
            config.request_timeout_ms = parse_millis(ENV_API_TIMEOUT_MS, &ms)?;
        }
        if let Some(ms) = lookup(ENV_REFRESH_TIMEOUT_MS) {
            config.refresh_timeout_ms = parse_millis(ENV_REFRESH_TIMEOUT_MS, &ms)?;
        }
        if let Some(flag) = lookup(ENV_REPORT_ERRORS) {
            config.report_errors = matches!(flag.trim(), "1" | "true" | "TRUE" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(GatewayError::Config("api_base_url is empty".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(GatewayError::Config("request_timeout_ms must be positive".to_string()));
        }
        if self.refresh_timeout_ms == 0 {
            return Err(GatewayError::Config("refresh_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

fn parse_millis(key: &str, raw: &str) -> GatewayResult<u64> {
    raw.trim()
        .parse()
        .map_err(|e| GatewayError::Config(format!("{key}={raw:?}: {e}")))
}
