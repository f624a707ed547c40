//! Request builder.

use crate::{HttpClient, HttpClientError, Response, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use secrecy::ExposeSecret;
use std::time::Duration;

/// How a request treats the configured session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionToken {
    /// Never attach it.
    #[default]
    Omit,
    /// Attach it when configured and no `Authorization` header is set.
    IfConfigured,
    /// Attach it; sending fails when none is configured.
    Required,
}

/// HTTP request builder.
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
    session: SessionToken,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a HttpClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            session: SessionToken::Omit,
        }
    }

    /// Add a header to the request. Invalid names or values are skipped.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Add multiple headers to the request, keeping repeated values.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut current = None;
        for (name, value) in headers {
            if let Some(name) = name {
                current = Some(name);
            }
            if let Some(name) = &current {
                self.headers.append(name.clone(), value);
            }
        }
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add multiple query parameters.
    pub fn queries<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in params {
            self.query.push((k.into(), v.into()));
        }
        self
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a custom timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Choose how the session token is attached.
    pub fn session(mut self, session: SessionToken) -> Self {
        self.session = session;
        self
    }

    /// Absolute URL this request will be sent to, query included.
    pub fn url(&self) -> Result<url::Url> {
        let mut url = if let Some(base) = &self.client.config().base_url {
            let base =
                url::Url::parse(base).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?;
            base.join(&self.url)
                .map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?
        } else {
            url::Url::parse(&self.url).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?
        };

        if !self.query.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                query_pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    fn session_header(&self) -> Result<Option<HeaderValue>> {
        let token = match self.session {
            SessionToken::Omit => return Ok(None),
            SessionToken::IfConfigured if self.headers.contains_key(header::AUTHORIZATION) => {
                return Ok(None);
            }
            SessionToken::IfConfigured => match self.client.session_token() {
                Some(token) => token,
                None => return Ok(None),
            },
            SessionToken::Required => self
                .client
                .session_token()
                .ok_or(HttpClientError::MissingSession)?,
        };

        let mut value = HeaderValue::try_from(format!("Bearer {}", token.expose_secret()))
            .map_err(|_| HttpClientError::RequestBuild("session token is not a valid header value".into()))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    /// Send the request.
    pub async fn send(self) -> Result<Response> {
        let url = self.url()?;
        let session = self.session_header()?;

        let mut request = self.client.inner().request(self.method.clone(), url);

        for (name, value) in &self.client.config().default_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some(session) = session {
            request = request.header(header::AUTHORIZATION, session);
        }

        if let Some(body) = self.body {
            request = request.body(body);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let request = request
            .build()
            .map_err(|e| HttpClientError::RequestBuild(e.to_string()))?;
        self.client.execute(request).await
    }
}
