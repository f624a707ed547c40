//! Target endpoint selection and path building

use crate::{Result, WebhookError};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left as-is in an event path segment
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Which remote endpoint receives the webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Fires the webhook
    Live,

    /// Authenticated preflight endpoint
    Draft,

    /// Static validation, never executes anything
    Validate,
}

impl EndpointKind {
    /// Pick the endpoint; validate-only wins over draft/live
    pub fn select(draft: bool, validate_only: bool) -> Self {
        match (validate_only, draft) {
            (true, _) => Self::Validate,
            (false, true) => Self::Draft,
            (false, false) => Self::Live,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Draft => "draft",
            Self::Validate => "validate",
        }
    }

    /// How the session token is treated for this endpoint
    pub fn session_auth(&self) -> SessionAuth {
        match self {
            Self::Live => SessionAuth::Strip,
            Self::Draft => SessionAuth::Require,
            Self::Validate => SessionAuth::Preserve,
        }
    }

    /// Workspace-relative request path for `event_path`
    pub fn path(&self, workspace: &str, event_path: &str) -> Result<String> {
        let workspace = workspace.trim_matches('/');
        if workspace.is_empty() {
            return Err(WebhookError::config("a workspace is required"));
        }
        if is_dot_segment(workspace) {
            return Err(WebhookError::config(format!(
                "workspace {workspace:?} is not a valid path segment"
            )));
        }
        let escaped = escape_event_path(event_path)?;
        if escaped.is_empty() {
            return Err(WebhookError::config("an event path is required"));
        }

        let workspace = utf8_percent_encode(workspace, SEGMENT);
        Ok(match self {
            Self::Live => format!("{workspace}/events/{escaped}"),
            Self::Draft => format!("{workspace}/api/events/draft/{escaped}"),
            Self::Validate => format!("{workspace}/api/events/validate/{escaped}"),
        })
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-token policy handed to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAuth {
    /// Never send the session token
    Strip,

    /// Send the session token when one is configured
    Preserve,

    /// Send the session token; fail when none is configured
    Require,
}

fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

/// Percent-escape every `/`-separated segment on its own, dropping empty ones
///
/// `.` and `..` segments are rejected: URL resolution would move the request
/// out of the endpoint prefix.
pub fn escape_event_path(path: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        if is_dot_segment(segment) {
            return Err(WebhookError::config(format!(
                "event path {path:?} must not contain {segment:?} segments"
            )));
        }
        segments.push(utf8_percent_encode(segment, SEGMENT).to_string());
    }
    Ok(segments.join("/"))
}
