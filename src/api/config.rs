use std::time::Duration;

use super::error::{ApiError, ApiResult};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Runtime configuration describing how to reach the play API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Root URL of the play API; a trailing slash is ignored.
    pub base_url: String,
    /// Applied to every request except the realtime stream; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Bearer token used for host-only endpoints.
    pub host_token: Option<String>,
}

impl ApiConfig {
    /// Construct a configuration for the given base URL with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            host_token: None,
        }
    }

    /// Override the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Attach host credentials.
    pub fn with_host_token(mut self, token: impl Into<String>) -> Self {
        self.host_token = Some(token.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    ///
    /// `PLAY_API_BASE_URL` is required; `PLAY_API_TIMEOUT_MS` (0 disables the timeout) and
    /// `PLAY_HOST_TOKEN` are optional.
    pub fn from_env() -> ApiResult<Self> {
        let base_url = std::env::var("PLAY_API_BASE_URL").map_err(|source| ApiError::ClientBuilder {
            source: Box::new(source),
        })?;
        let mut config = Self::new(base_url);

        if let Some(ms) = std::env::var("PLAY_API_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
        {
            config.request_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        if let Ok(token) = std::env::var("PLAY_HOST_TOKEN") {
            config = config.with_host_token(token);
        }

        Ok(config)
    }
}
