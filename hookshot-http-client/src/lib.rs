//! # Hookshot HTTP Client
//!
//! The transport behind webhook dispatch: one request per call, a single
//! timeout as the only cancellation point, and an optional workspace session
//! token that callers opt into per request.
//!
//! Failures are returned to the caller as-is; nothing is retried here.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hookshot_http_client::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HttpClientConfig::builder()
//!         .base_url("https://hooks.example.com/api/w/")
//!         .timeout(Duration::from_secs(10))
//!         .build();
//!     let client = HttpClient::new(config)?;
//!
//!     let response = client
//!         .post("acme/events/orders")
//!         .header("Content-Type", "application/json")
//!         .body(br#"{"orderId":"o-1"}"#.to_vec())
//!         .send()
//!         .await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;

pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use error::{HttpClientError, Result};
pub use request::{RequestBuilder, SessionToken};
pub use response::Response;

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use url::Url;
