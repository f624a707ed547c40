//! Webhook signature generation

use crate::keys::{KeyStore, PemFileKeyStore};
use crate::{Result, SignatureEncoding, WebhookConfig, WebhookError};
use hmac::{Hmac, Mac};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Supported signing algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256 over a shared secret
    HmacSha256,

    /// ECDSA over NIST P-256 with SHA-256, DER encoded
    EcdsaP256,
}

impl SignatureAlgorithm {
    /// Parse an algorithm name (case-insensitive)
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hmac-sha256" | "hmac" | "sha256" => Ok(Self::HmacSha256),
            "ecdsa-p256" | "ecdsa" | "es256" => Ok(Self::EcdsaP256),
            other => Err(WebhookError::config(format!(
                "unsupported signature algorithm {other:?} (expected hmac-sha256 or ecdsa-p256)"
            ))),
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::EcdsaP256 => "ecdsa-p256",
        }
    }

    /// Whether a public key can verify this algorithm's signatures
    pub fn is_asymmetric(&self) -> bool {
        matches!(self, Self::EcdsaP256)
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which key signs the message
#[derive(Debug, Clone)]
pub enum SignatureScheme {
    Hmac(SecretString),
    Ecdsa { private_key_path: PathBuf },
}

impl SignatureScheme {
    /// The algorithm this scheme signs with
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Hmac(_) => SignatureAlgorithm::HmacSha256,
            Self::Ecdsa { .. } => SignatureAlgorithm::EcdsaP256,
        }
    }
}

/// A fully resolved signing configuration
#[derive(Debug, Clone)]
pub struct SignatureSpec {
    pub scheme: SignatureScheme,
    pub header_name: String,
    pub encoding: SignatureEncoding,
    pub prefix: Option<String>,
}

/// Binds a timestamp into the signed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampBinding {
    /// Header carrying the timestamp
    pub header_name: String,

    /// Explicit value; the current Unix time in seconds when absent
    pub value: Option<String>,
}

impl TimestampBinding {
    /// The explicit value, or the current Unix time in whole seconds
    pub fn resolve_value(&self) -> String {
        self.value.clone().unwrap_or_else(current_timestamp)
    }
}

/// Flag-level signing inputs
#[derive(Debug, Clone, Default)]
pub struct SigningOptions {
    /// Shortcut meaning "HMAC-SHA256 with this secret"
    pub legacy_secret: Option<SecretString>,

    /// Explicit algorithm name, see [`SignatureAlgorithm::parse`]
    pub algorithm: Option<String>,

    /// HMAC secret for an explicit `hmac-sha256` algorithm
    pub secret: Option<SecretString>,

    /// PEM private key for `ecdsa-p256`
    pub private_key_path: Option<PathBuf>,

    /// Signature header override
    pub header_name: Option<String>,

    /// `base64` (default) or `hex`
    pub encoding: Option<String>,

    /// Prepended to the encoded signature, e.g. `sha256=`
    pub prefix: Option<String>,

    /// Header carrying the bound timestamp
    pub timestamp_header: Option<String>,

    /// Explicit timestamp value
    pub timestamp_value: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn non_empty_secret(secret: &Option<SecretString>) -> Option<&SecretString> {
    secret.as_ref().filter(|s| !s.expose_secret().is_empty())
}

impl SigningOptions {
    /// Resolve the options into a [`SignatureSpec`] and optional timestamp binding
    ///
    /// Returns `Ok(None)` when no algorithm is selected: signing is optional.
    pub fn resolve(
        &self,
        config: &WebhookConfig,
    ) -> Result<Option<(SignatureSpec, Option<TimestampBinding>)>> {
        let legacy = non_empty_secret(&self.legacy_secret);
        let algorithm = non_blank(&self.algorithm);

        if legacy.is_some() && algorithm.is_some() {
            return Err(WebhookError::config(
                "the shared-secret shortcut and an explicit signature algorithm are mutually exclusive",
            ));
        }

        let scheme = match (legacy, algorithm) {
            (Some(secret), _) => SignatureScheme::Hmac(secret.clone()),
            (None, Some(name)) => match SignatureAlgorithm::parse(name)? {
                SignatureAlgorithm::HmacSha256 => {
                    let secret = non_empty_secret(&self.secret).ok_or_else(|| {
                        WebhookError::config("hmac-sha256 signing requires a non-empty secret")
                    })?;
                    SignatureScheme::Hmac(secret.clone())
                }
                SignatureAlgorithm::EcdsaP256 => {
                    let path = self
                        .private_key_path
                        .as_ref()
                        .filter(|p| !p.as_os_str().is_empty())
                        .ok_or_else(|| {
                            WebhookError::config("ecdsa-p256 signing requires a private key file")
                        })?;
                    SignatureScheme::Ecdsa {
                        private_key_path: path.clone(),
                    }
                }
            },
            (None, None) => {
                if non_empty_secret(&self.secret).is_some() || self.private_key_path.is_some() {
                    warn!("Signing key material given without a signature algorithm; not signing");
                }
                return Ok(None);
            }
        };

        let encoding = match non_blank(&self.encoding) {
            Some(name) => SignatureEncoding::parse(name)?,
            None => config.signature_encoding,
        };

        let timestamp = match (non_blank(&self.timestamp_header), non_blank(&self.timestamp_value)) {
            (Some(header), value) => Some(TimestampBinding {
                header_name: header.to_string(),
                value: value.map(str::to_string),
            }),
            (None, Some(_)) => {
                return Err(WebhookError::config(
                    "a timestamp value requires a timestamp header name",
                ));
            }
            (None, None) => None,
        };

        let spec = SignatureSpec {
            scheme,
            header_name: non_blank(&self.header_name)
                .unwrap_or(&config.signature_header)
                .to_string(),
            encoding,
            prefix: self.prefix.clone().filter(|p| !p.is_empty()),
        };

        Ok(Some((spec, timestamp)))
    }
}

/// Output of a signing pass, kept only for the in-process self-check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePreview {
    pub algorithm: SignatureAlgorithm,

    /// Raw signature bytes (DER for ECDSA)
    pub signature: Vec<u8>,

    /// The exact bytes that were signed
    pub message: Vec<u8>,

    /// The bound timestamp, if any
    pub timestamp: Option<String>,
}

/// Computes signatures and writes the signature and timestamp headers
#[derive(Clone)]
pub struct SignatureEngine {
    keys: Arc<dyn KeyStore>,
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine").finish_non_exhaustive()
    }
}

impl Default for SignatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureEngine {
    /// Create an engine that loads keys from PEM files
    pub fn new() -> Self {
        Self::with_key_store(Arc::new(PemFileKeyStore))
    }

    /// Create an engine over a custom key store
    pub fn with_key_store(keys: Arc<dyn KeyStore>) -> Self {
        Self { keys }
    }

    /// Resolve `options` and sign `body`; `Ok(None)` when no algorithm is selected
    pub fn sign_with_options(
        &self,
        headers: &mut HeaderMap,
        body: &[u8],
        options: &SigningOptions,
        config: &WebhookConfig,
    ) -> Result<Option<SignaturePreview>> {
        match options.resolve(config)? {
            Some((spec, timestamp)) => self
                .sign(headers, body, &spec, timestamp.as_ref())
                .map(Some),
            None => Ok(None),
        }
    }

    /// Sign `body`, optionally bound to a timestamp, and set the headers
    pub fn sign(
        &self,
        headers: &mut HeaderMap,
        body: &[u8],
        spec: &SignatureSpec,
        timestamp: Option<&TimestampBinding>,
    ) -> Result<SignaturePreview> {
        let signature_header = header_name(&spec.header_name)?;
        let timestamp = match timestamp {
            Some(binding) => Some((header_name(&binding.header_name)?, binding.resolve_value())),
            None => None,
        };

        let message = signed_message(timestamp.as_ref().map(|(_, v)| v.as_str()), body);

        let signature = match &spec.scheme {
            SignatureScheme::Hmac(secret) => {
                if secret.expose_secret().is_empty() {
                    return Err(WebhookError::config(
                        "hmac-sha256 signing requires a non-empty secret",
                    ));
                }
                compute_hmac_sha256(secret.expose_secret().as_bytes(), &message)?
            }
            SignatureScheme::Ecdsa { private_key_path } => {
                self.keys.private_key(private_key_path)?.sign(&message)?
            }
        };

        if let Some((name, value)) = &timestamp {
            let value = HeaderValue::from_str(value).map_err(|_| {
                WebhookError::config(format!("invalid timestamp header value {value:?}"))
            })?;
            headers.insert(name.clone(), value);
        }

        let encoded = format!(
            "{}{}",
            spec.prefix.as_deref().unwrap_or_default(),
            spec.encoding.encode(&signature)
        );
        if !encoded.is_empty() {
            let value = HeaderValue::from_str(&encoded)
                .map_err(|_| WebhookError::config("signature prefix is not a valid header value"))?;
            headers.insert(signature_header, value);
        }

        let algorithm = spec.scheme.algorithm();
        debug!(
            %algorithm,
            header = %spec.header_name,
            encoding = spec.encoding.as_str(),
            timestamped = timestamp.is_some(),
            message_bytes = message.len(),
            "Signed webhook payload"
        );

        Ok(SignaturePreview {
            algorithm,
            signature,
            message,
            timestamp: timestamp.map(|(_, v)| v),
        })
    }
}

/// The bytes that get signed: `timestamp ++ body`, or `body` alone
pub fn signed_message(timestamp: Option<&str>, body: &[u8]) -> Vec<u8> {
    match timestamp {
        Some(ts) => {
            let mut message = Vec::with_capacity(ts.len() + body.len());
            message.extend_from_slice(ts.as_bytes());
            message.extend_from_slice(body);
            message
        }
        None => body.to_vec(),
    }
}

/// Compute HMAC-SHA256 signature
pub fn compute_hmac_sha256(secret: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| WebhookError::SigningFailed(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Get current Unix timestamp as string
fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::try_from(name)
        .map_err(|_| WebhookError::config(format!("invalid header name {name:?}")))
}
