//! Webhook request construction, signing and self-verification
//!
//! This crate turns loosely specified inputs (a payload source, optional
//! credentials, an optional signing algorithm with key material) into a
//! wire-ready POST, checks it locally and sends it to one of three remote
//! endpoints.
//!
//! # Features
//!
//! - **Payloads**: inline JSON, JSON files, raw files, URL-encoded forms and
//!   multipart uploads, each with a human-inspectable input map
//! - **Auth**: API key (header or query), bearer token or basic auth
//! - **Signing**: HMAC-SHA256 and ECDSA-P256, optionally bound to a timestamp
//! - **Self-verification**: ECDSA signatures checked against a public key
//!   and timestamp skew checked before anything leaves the process
//! - **Endpoints**: live, draft and validate-only routing with per-endpoint
//!   session token handling
//!
//! Nothing is retried. Every failure is returned as a [`WebhookError`] and
//! [`WebhookError::kind`] tells configuration, I/O, parse, crypto, transport
//! and API failures apart.
//!
//! # Example: Signing and sending
//!
//! ```rust,no_run
//! use hookshot_http_client::HttpClientConfig;
//! use hookshot_webhooks::{
//!     DispatchOptions, PayloadOptions, SendOptions, SigningOptions, WebhookClient, WebhookConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http = HttpClientConfig::builder()
//!         .base_url("https://hooks.example.com/api/w/")
//!         .build();
//!     let client = WebhookClient::with_http_config(WebhookConfig::default(), http)?;
//!
//!     let options = SendOptions {
//!         payload: PayloadOptions {
//!             json: Some(r#"{"orderId":"o-1"}"#.to_string()),
//!             ..Default::default()
//!         },
//!         signing: SigningOptions {
//!             legacy_secret: Some("shh".to_string().into()),
//!             timestamp_header: Some("X-Timestamp".to_string()),
//!             ..Default::default()
//!         },
//!         dispatch: DispatchOptions {
//!             workspace: "acme".to_string(),
//!             event_path: "orders/created".to_string(),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let outcome = client.send(&options).await?;
//!     println!("{} endpoint answered {}", outcome.endpoint, outcome.status);
//!     Ok(())
//! }
//! ```
//!
//! # Example: Preparing without sending
//!
//! ```rust,no_run
//! use hookshot_webhooks::{PayloadBuilder, PayloadOptions, WebhookConfig};
//!
//! let config = WebhookConfig::default();
//! let payload = PayloadBuilder::new(&config).build(&PayloadOptions {
//!     json: Some(r#"{"a":1}"#.to_string()),
//!     ..Default::default()
//! })?;
//! assert_eq!(payload.content_type, "application/json");
//! # Ok::<(), hookshot_webhooks::WebhookError>(())
//! ```

mod auth;
mod client;
mod config;
mod dispatcher;
mod endpoint;
mod error;
pub mod keys;
mod payload;
mod signature;
mod validator;

pub use auth::{ApiKeyLocation, AuthOptions, AuthScheme, apply_auth};
pub use client::{PreparedWebhook, SendOptions, WebhookClient, parse_header};
pub use config::{ENV_PREFIX, SignatureEncoding, WebhookConfig, WebhookConfigBuilder};
pub use dispatcher::{
    DispatchOptions, DispatchOutcome, Dispatcher, RestClient, RestRequest, RestResponse,
};
pub use endpoint::{EndpointKind, SessionAuth, escape_event_path};
pub use error::{ErrorKind, WebhookError};
pub use payload::{
    FILE_PATH_PLACEHOLDER, FileField, FilePart, FormField, PayloadBuilder, PayloadOptions,
    PayloadSource, WebhookPayload,
};
pub use signature::{
    SignatureAlgorithm, SignatureEngine, SignaturePreview, SignatureScheme, SignatureSpec,
    SigningOptions, TimestampBinding, compute_hmac_sha256, signed_message,
};
pub use validator::{
    SignatureValidator, ValidationOptions, check_timestamp_skew, timestamp_millis,
};

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;
