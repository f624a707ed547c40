//! Error types for webhook operations

use crate::EndpointKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, signing, checking or sending a webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Conflicting or missing options, detected before any I/O
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A declared payload or key file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Payload content could not be parsed
    #[error("Payload error: {0}")]
    PayloadError(String),

    /// Key material could not be parsed or has the wrong type
    #[error("Key error: {0}")]
    KeyError(String),

    /// Computing the signature failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Timestamp validation failed
    #[error("Timestamp validation failed: {0}")]
    TimestampInvalid(String),

    /// The request never produced a response
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The remote API answered with a failure status
    #[error("{endpoint} endpoint returned HTTP {status}")]
    Api {
        endpoint: EndpointKind,
        status: u16,
        body: serde_json::Value,
    },
}

/// Coarse classification of a [`WebhookError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Parse,
    Crypto,
    Transport,
    Api,
}

impl WebhookError {
    /// Classify this error for callers that branch on the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_) => ErrorKind::Configuration,
            Self::Io { .. } => ErrorKind::Io,
            Self::PayloadError(_) => ErrorKind::Parse,
            Self::KeyError(_)
            | Self::SigningFailed(_)
            | Self::SignatureInvalid(_)
            | Self::TimestampInvalid(_) => ErrorKind::Crypto,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Api { .. } => ErrorKind::Api,
        }
    }

    /// The decoded response body, when the remote API rejected the request
    pub fn response_body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
