//! Routing a prepared webhook to the live, draft or validate endpoint

use crate::{EndpointKind, Result, SessionAuth, WebhookConfig, WebhookError};
use async_trait::async_trait;
use hookshot_http_client::{HttpClient, HttpClientError, SessionToken};
use http::HeaderMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A fully built POST handed to the transport
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// Workspace-relative path
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub headers: HeaderMap,
    pub session: SessionAuth,

    /// Overrides the transport's default deadline
    pub timeout: Option<Duration>,
}

/// Decoded transport response
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    /// JSON when parseable, otherwise a JSON string; `null` when empty
    pub body: Value,
}

/// Transport seam used by the [`Dispatcher`]
///
/// Implementations perform exactly one request. Any HTTP status is a
/// successful return; only failures to obtain a response are errors.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Whether a workspace session token is available
    fn has_session(&self) -> bool;

    /// POST `request` and return the decoded response
    async fn post(&self, request: RestRequest) -> Result<RestResponse>;
}

#[async_trait]
impl RestClient for HttpClient {
    fn has_session(&self) -> bool {
        HttpClient::has_session(self)
    }

    async fn post(&self, request: RestRequest) -> Result<RestResponse> {
        let session = match request.session {
            SessionAuth::Strip => SessionToken::Omit,
            SessionAuth::Preserve => SessionToken::IfConfigured,
            SessionAuth::Require => SessionToken::Required,
        };
        let mut builder = HttpClient::post(self, request.path.as_str())
            .queries(request.query)
            .headers(request.headers)
            .body(request.body)
            .session(session);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let url = match builder.url() {
            Ok(mut url) => {
                // query values may carry an API key
                url.set_query(None);
                url.to_string()
            }
            Err(e) => {
                return Err(WebhookError::Transport {
                    url: request.path,
                    message: e.to_string(),
                });
            }
        };

        match builder.send().await {
            Ok(response) => Ok(RestResponse {
                status: response.status().as_u16(),
                body: response.decoded(),
            }),
            Err(HttpClientError::MissingSession) => Err(WebhookError::config(
                "this endpoint requires a session token",
            )),
            Err(e) => Err(WebhookError::Transport {
                url,
                message: e.to_string(),
            }),
        }
    }
}

/// Where and how to send
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub workspace: String,

    /// `/`-separated event path; every segment is escaped on its own
    pub event_path: String,

    /// Route to the authenticated draft endpoint
    pub draft: bool,

    /// Route to the validate endpoint; never executes anything
    pub validate_only: bool,

    /// Ask the validate endpoint to keep what it created
    pub persist_resources: bool,

    /// Write the decoded response here before classifying it
    pub output_file: Option<PathBuf>,

    /// Overrides [`WebhookConfig::failure_status_threshold`]
    pub failure_status_threshold: Option<u16>,

    /// Deadline for this send; the transport default applies when unset
    pub timeout: Option<Duration>,
}

impl DispatchOptions {
    pub fn endpoint(&self) -> EndpointKind {
        EndpointKind::select(self.draft, self.validate_only)
    }

    /// Configuration checks that need no I/O
    pub fn check(&self) -> Result<()> {
        if self.persist_resources && !self.validate_only {
            return Err(WebhookError::config(
                "resource persistence may only be requested in validate-only mode",
            ));
        }
        Ok(())
    }

    /// Endpoint flags appended after any auth query parameters
    pub fn query_flags(&self) -> Vec<(String, String)> {
        let mut flags = Vec::new();
        if self.validate_only && self.draft {
            flags.push(("draft".to_string(), "true".to_string()));
        }
        if self.validate_only && self.persist_resources {
            flags.push(("persist-resources".to_string(), "true".to_string()));
        }
        flags
    }
}

/// Result of a send that the remote API accepted
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub endpoint: EndpointKind,
    pub status: u16,
    pub body: Value,
}

/// Sends one prepared webhook and classifies the response
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn RestClient>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(client: Arc<dyn RestClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn RestClient> {
        &self.client
    }

    /// Send `body` with `headers` and the auth `query` to the selected endpoint
    pub async fn dispatch(
        &self,
        options: &DispatchOptions,
        config: &WebhookConfig,
        body: Vec<u8>,
        headers: HeaderMap,
        query: Vec<(String, String)>,
    ) -> Result<DispatchOutcome> {
        options.check()?;

        let endpoint = options.endpoint();
        let session = endpoint.session_auth();
        if session == SessionAuth::Require && !self.client.has_session() {
            return Err(WebhookError::config(format!(
                "the {endpoint} endpoint requires a session token"
            )));
        }

        let path = endpoint.path(&options.workspace, &options.event_path)?;
        let mut query = query;
        query.extend(options.query_flags());

        debug!(%endpoint, path = %path, bytes = body.len(), "Dispatching webhook");
        let response = self
            .client
            .post(RestRequest {
                path,
                query,
                body,
                headers,
                session,
                timeout: options.timeout,
            })
            .await?;

        if let Some(output_file) = &options.output_file {
            write_output(output_file, &response.body)?;
        }

        let threshold = options
            .failure_status_threshold
            .unwrap_or(config.failure_status_threshold);
        if response.status >= threshold {
            warn!(%endpoint, status = response.status, "Webhook rejected");
            return Err(WebhookError::Api {
                endpoint,
                status: response.status,
                body: response.body,
            });
        }

        info!(%endpoint, status = response.status, "Webhook accepted");
        Ok(DispatchOutcome {
            endpoint,
            status: response.status,
            body: response.body,
        })
    }
}

fn write_output(path: &Path, body: &Value) -> Result<()> {
    let mut rendered = serde_json::to_vec_pretty(body)
        .map_err(|e| WebhookError::PayloadError(format!("response is not serializable: {e}")))?;
    rendered.push(b'\n');
    std::fs::write(path, rendered).map_err(|e| WebhookError::io(path, e))
}
