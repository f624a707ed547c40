//! Engine defaults
//!
//! Every default header name, content type and encoding used by the engine
//! lives in [`WebhookConfig`] rather than inline in the components.

use crate::{Result, WebhookError};
use base64::Engine;
use serde::Deserialize;
use std::path::Path;

/// Prefix for environment overrides read by [`WebhookConfig::from_env`]
pub const ENV_PREFIX: &str = "HOOKSHOT_";

/// Defaults applied when a request does not override them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Header carrying the encoded signature
    pub signature_header: String,

    /// Encoding of the raw signature bytes
    pub signature_encoding: SignatureEncoding,

    /// Header used for API-key auth in header mode
    pub api_key_header: String,

    /// Query parameter used for API-key auth in query mode
    pub api_key_query_param: String,

    /// Content type for inline JSON and JSON-file payloads
    pub json_content_type: String,

    /// Content type for raw-file payloads
    pub raw_content_type: String,

    /// Responses with a status at or above this value are failures
    pub failure_status_threshold: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            signature_header: "X-Signature".to_string(),
            signature_encoding: SignatureEncoding::Base64,
            api_key_header: "X-API-Key".to_string(),
            api_key_query_param: "token".to_string(),
            json_content_type: "application/json".to_string(),
            raw_content_type: "application/octet-stream".to_string(),
            failure_status_threshold: 400,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    webhook: WebhookConfig,
}

impl WebhookConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> WebhookConfigBuilder {
        WebhookConfigBuilder::new()
    }

    /// Defaults overlaid with `HOOKSHOT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary variable lookup
    ///
    /// Keys are the upper-cased field names prefixed with [`ENV_PREFIX`],
    /// e.g. `HOOKSHOT_SIGNATURE_HEADER`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(v) = var("SIGNATURE_HEADER") {
            config.signature_header = v;
        }
        if let Some(v) = var("SIGNATURE_ENCODING") {
            config.signature_encoding = SignatureEncoding::parse(&v)?;
        }
        if let Some(v) = var("API_KEY_HEADER") {
            config.api_key_header = v;
        }
        if let Some(v) = var("API_KEY_QUERY_PARAM") {
            config.api_key_query_param = v;
        }
        if let Some(v) = var("JSON_CONTENT_TYPE") {
            config.json_content_type = v;
        }
        if let Some(v) = var("RAW_CONTENT_TYPE") {
            config.raw_content_type = v;
        }
        if let Some(v) = var("FAILURE_STATUS_THRESHOLD") {
            config.failure_status_threshold = v.parse().map_err(|_| {
                WebhookError::config(format!(
                    "{ENV_PREFIX}FAILURE_STATUS_THRESHOLD must be an HTTP status, got {v:?}"
                ))
            })?;
        }
        Ok(config)
    }

    /// Parse a TOML document with an optional `[webhook]` table
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let document: ConfigDocument = toml::from_str(source)
            .map_err(|e| WebhookError::config(format!("invalid config file: {e}")))?;
        Ok(document.webhook)
    }

    /// Load a TOML config file, see [`WebhookConfig::from_toml_str`]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| WebhookError::io(path, e))?;
        Self::from_toml_str(&source)
    }
}

/// Builder for WebhookConfig
#[derive(Debug, Clone, Default)]
pub struct WebhookConfigBuilder {
    config: WebhookConfig,
}

impl WebhookConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: WebhookConfig::default(),
        }
    }

    /// Set the default signature header
    pub fn signature_header(mut self, name: impl Into<String>) -> Self {
        self.config.signature_header = name.into();
        self
    }

    /// Set the default signature encoding
    pub fn signature_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.config.signature_encoding = encoding;
        self
    }

    /// Set the default API-key header
    pub fn api_key_header(mut self, name: impl Into<String>) -> Self {
        self.config.api_key_header = name.into();
        self
    }

    /// Set the default API-key query parameter
    pub fn api_key_query_param(mut self, name: impl Into<String>) -> Self {
        self.config.api_key_query_param = name.into();
        self
    }

    /// Set the JSON content type
    pub fn json_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.json_content_type = content_type.into();
        self
    }

    /// Set the raw-file content type
    pub fn raw_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.raw_content_type = content_type.into();
        self
    }

    /// Set the failure status threshold
    pub fn failure_status_threshold(mut self, status: u16) -> Self {
        self.config.failure_status_threshold = status;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WebhookConfig {
        self.config
    }
}

/// Text encoding of raw signature bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
    /// Standard base64 with padding
    #[default]
    Base64,

    /// Lowercase hexadecimal
    Hex,
}

impl SignatureEncoding {
    /// Normalize a user-supplied encoding name; empty means base64
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            other => Err(WebhookError::config(format!(
                "unsupported signature encoding {other:?} (expected base64 or hex)"
            ))),
        }
    }

    /// Encode raw bytes
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
            Self::Hex => hex::encode(bytes),
        }
    }

    /// Decode an encoded signature back to raw bytes
    pub fn decode(&self, encoded: &str) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| WebhookError::SignatureInvalid(format!("invalid base64: {e}"))),
            Self::Hex => hex::decode(encoded)
                .map_err(|e| WebhookError::SignatureInvalid(format!("invalid hex: {e}"))),
        }
    }

    /// Name used in headers and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Hex => "hex",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = WebhookConfig::default();
        assert_eq!(config.signature_header, "X-Signature");
        assert_eq!(config.signature_encoding, SignatureEncoding::Base64);
        assert_eq!(config.api_key_header, "X-API-Key");
        assert_eq!(config.api_key_query_param, "token");
        assert_eq!(config.failure_status_threshold, 400);
    }

    #[test]
    fn test_builder() {
        let config = WebhookConfig::builder()
            .signature_header("X-Hub-Signature")
            .signature_encoding(SignatureEncoding::Hex)
            .failure_status_threshold(500)
            .build();

        assert_eq!(config.signature_header, "X-Hub-Signature");
        assert_eq!(config.signature_encoding, SignatureEncoding::Hex);
        assert_eq!(config.failure_status_threshold, 500);
        assert_eq!(config.api_key_header, "X-API-Key");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("HOOKSHOT_SIGNATURE_ENCODING", "HEX"),
            ("HOOKSHOT_API_KEY_HEADER", "X-Token"),
            ("HOOKSHOT_FAILURE_STATUS_THRESHOLD", "500"),
            ("HOOKSHOT_RAW_CONTENT_TYPE", "  "),
        ]
        .into_iter()
        .collect();

        let config =
            WebhookConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.signature_encoding, SignatureEncoding::Hex);
        assert_eq!(config.api_key_header, "X-Token");
        assert_eq!(config.failure_status_threshold, 500);
        assert_eq!(config.raw_content_type, "application/octet-stream");
    }

    #[test]
    fn test_from_lookup_rejects_bad_threshold() {
        let result = WebhookConfig::from_lookup(|k| {
            (k == "HOOKSHOT_FAILURE_STATUS_THRESHOLD").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(WebhookError::ConfigError(_))));
    }

    #[test]
    fn test_from_toml_str() {
        let config = WebhookConfig::from_toml_str(
            r#"
            [webhook]
            signature_header = "X-Sig"
            signature_encoding = "hex"
            "#,
        )
        .unwrap();
        assert_eq!(config.signature_header, "X-Sig");
        assert_eq!(config.signature_encoding, SignatureEncoding::Hex);
        assert_eq!(config.json_content_type, "application/json");

        assert_eq!(WebhookConfig::from_toml_str("").unwrap(), WebhookConfig::default());
        assert!(WebhookConfig::from_toml_str("[webhook]\nsignature_encoding = \"b32\"").is_err());
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!(SignatureEncoding::parse("").unwrap(), SignatureEncoding::Base64);
        assert_eq!(SignatureEncoding::parse(" Base64 ").unwrap(), SignatureEncoding::Base64);
        assert_eq!(SignatureEncoding::parse("hex").unwrap(), SignatureEncoding::Hex);
        assert!(SignatureEncoding::parse("base32").is_err());
    }

    #[test]
    fn test_encoding_decodes_what_it_encodes() {
        let raw = [0u8, 1, 2, 0xfe, 0xff];
        for encoding in [SignatureEncoding::Base64, SignatureEncoding::Hex] {
            let encoded = encoding.encode(&raw);
            assert_eq!(encoding.decode(&encoded).unwrap(), raw);
        }
        assert_eq!(SignatureEncoding::Hex.encode(&raw), "000102feff");
    }
}
