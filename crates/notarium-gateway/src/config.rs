//! Gateway configuration.

use notarium_core::defaults;

/// Configuration for the HTTP note authority client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the remote note authority (no trailing slash).
    pub base_url: String,
    /// Timeout for note CRUD requests in seconds.
    pub timeout_secs: u64,
    /// Timeout for media uploads in seconds.
    pub upload_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_BASE_URL.to_string(),
            timeout_secs: defaults::API_TIMEOUT_SECS,
            upload_timeout_secs: defaults::MEDIA_UPLOAD_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTARIUM_API_URL` | `http://127.0.0.1:4000` | Remote authority base URL |
    pub fn from_env() -> Self {
        let base_url = std::env::var(defaults::ENV_API_BASE_URL)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| defaults::API_BASE_URL.to_string());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set the CRUD request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the media upload timeout.
    pub fn with_upload_timeout_secs(mut self, secs: u64) -> Self {
        self.upload_timeout_secs = secs;
        self
    }
}
