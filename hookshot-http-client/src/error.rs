//! Transport errors.

use std::time::Duration;
use thiserror::Error;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, HttpClientError>;

/// Failures to obtain a response. An HTTP error status is not one of them.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The configured deadline elapsed.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The remote host could not be reached.
    #[error("could not connect: {0}")]
    Connection(String),

    /// Base URL or request path do not form a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be assembled.
    #[error("could not build request: {0}")]
    RequestBuild(String),

    /// The request requires a session token and none is configured.
    #[error("no session token configured")]
    MissingSession,

    /// Any other failure reported by reqwest.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl HttpClientError {
    /// Whether the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(HttpClientError::Timeout(Duration::from_secs(1)).is_timeout());
        assert!(!HttpClientError::Connection("refused".into()).is_timeout());
        assert!(!HttpClientError::InvalidUrl("x".into()).is_timeout());
        assert_eq!(
            HttpClientError::Timeout(Duration::from_millis(500)).to_string(),
            "no response within 500ms"
        );
    }
}
