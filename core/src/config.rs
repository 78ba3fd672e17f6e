//! Client configuration loaded from the environment.

use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Always ends in `/api`, never in a slash.
    pub base_url: String,
    pub timeout: Duration,
    /// Bearer token for the legacy endpoints. Cookie sessions need none.
    pub bearer_token: Option<String>,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            bearer_token: None,
        }
    }

    /// Reads `VMS_API_BASE_URL`, `VMS_API_TIMEOUT_MS` and `VMS_API_TOKEN`.
    pub fn from_env() -> Self {
        let base_url = try_load("VMS_API_BASE_URL", DEFAULT_BASE_URL.to_string());
        let timeout_ms = try_load("VMS_API_TIMEOUT_MS", DEFAULT_TIMEOUT_MS);
        let bearer_token = env::var("VMS_API_TOKEN").ok().filter(|t| !t.is_empty());

        let config = Self {
            base_url: normalize_base_url(&base_url),
            timeout: Duration::from_millis(timeout_ms),
            bearer_token,
        };
        info!(
            base_url = %config.base_url,
            timeout_ms,
            bearer = config.bearer_token.is_some(),
            "API config loaded"
        );
        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Ensure the base URL ends in `/api` without a trailing slash.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/api".to_string();
    }
    if trimmed.ends_with("/api") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api")
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
    }
}
