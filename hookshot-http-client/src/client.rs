//! HTTP client implementation.

use http::Method;
use reqwest::Request;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::{HttpClientConfig, HttpClientError, RequestBuilder, Response, Result};

/// Single-shot HTTP client with a request timeout and optional session token.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: Arc<HttpClientConfig>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);

        if config.gzip {
            builder = builder.gzip(true);
        }
        if config.brotli {
            builder = builder.brotli(true);
        }

        let inner = builder
            .build()
            .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Get the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Whether a session token is configured.
    pub fn has_session(&self) -> bool {
        self.config.session_token.is_some()
    }

    pub(crate) fn session_token(&self) -> Option<&SecretString> {
        self.config.session_token.as_ref()
    }

    /// Create a POST request builder.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::POST, url.into())
    }

    /// Execute a request exactly once.
    pub(crate) async fn execute(&self, request: Request) -> Result<Response> {
        let timeout = request.timeout().copied().unwrap_or(self.config.timeout);
        debug!(method = %request.method(), url = %without_query(request.url()), "Sending request");

        let response = self.inner.execute(request).await.map_err(|e| {
            let e = e.without_url();
            if e.is_timeout() {
                HttpClientError::Timeout(timeout)
            } else if e.is_connect() {
                HttpClientError::Connection(e.to_string())
            } else {
                HttpClientError::Http(e)
            }
        })?;

        Response::from_reqwest(response).await
    }
}

/// `url` with the query string removed; query values may carry credentials
pub(crate) fn without_query(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url
}
