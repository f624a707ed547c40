//! Transport settings.

use secrecy::SecretString;
use std::time::Duration;

/// Settings for [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request paths are resolved against this URL.
    pub base_url: Option<String>,
    /// Request timeout; the only deadline applied to a send.
    pub timeout: Duration,
    /// Deadline for establishing the connection alone.
    pub connect_timeout: Duration,
    /// Sent with every request, before request headers.
    pub default_headers: Vec<(String, String)>,
    /// `User-Agent` value.
    pub user_agent: String,
    /// Accept gzip-encoded responses.
    pub gzip: bool,
    /// Accept brotli-encoded responses.
    pub brotli: bool,
    /// Workspace session token, sent only on requests that opt in.
    pub session_token: Option<SecretString>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            default_headers: Vec::new(),
            user_agent: format!("hookshot/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
            brotli: true,
            session_token: None,
        }
    }
}

impl HttpClientConfig {
    /// Start from the defaults.
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`].
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Resolve request paths against `url`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Deadline for the whole request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Deadline for connecting.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Send `name: value` with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Override the `User-Agent`.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Toggle gzip response decoding.
    pub fn gzip(mut self, enable: bool) -> Self {
        self.config.gzip = enable;
        self
    }

    /// Toggle brotli response decoding.
    pub fn brotli(mut self, enable: bool) -> Self {
        self.config.brotli = enable;
        self
    }

    /// Set the workspace session token.
    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.config.session_token = Some(SecretString::from(token.into()));
        self
    }

    /// Finish building.
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}
