//! Pre-flight self-verification of a freshly computed signature

use crate::keys::{KeyStore, PemFileKeyStore};
use crate::{Result, SignaturePreview, WebhookError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Timestamps with at most this many digits are read as seconds
const SECONDS_MAX_DIGITS: usize = 10;

/// Inputs for the self-check
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Validate-only (dry-run) mode
    pub validate_only: bool,

    /// PEM PKIX public key matching the signing key
    pub public_key_path: Option<PathBuf>,

    /// Header the timestamp was bound under; enables the skew check
    pub timestamp_header: Option<String>,

    /// Explicit timestamp; falls back to the one captured while signing
    pub timestamp_value: Option<String>,

    /// Maximum accepted clock skew; `0` disables the check
    pub max_skew_ms: i64,
}

impl ValidationOptions {
    fn public_key_path(&self) -> Option<&PathBuf> {
        self.public_key_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    fn timestamp_header(&self) -> Option<&str> {
        self.timestamp_header
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    /// Configuration checks that need no I/O and no signature
    pub fn check(&self) -> Result<()> {
        if self.public_key_path().is_some() && !self.validate_only {
            return Err(WebhookError::config(
                "a public key may only be supplied in validate-only mode",
            ));
        }
        Ok(())
    }
}

/// Verifies a [`SignaturePreview`] against a public key and checks timestamp skew
#[derive(Clone)]
pub struct SignatureValidator {
    keys: Arc<dyn KeyStore>,
}

impl std::fmt::Debug for SignatureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureValidator").finish_non_exhaustive()
    }
}

impl Default for SignatureValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureValidator {
    /// Create a validator that loads public keys from PEM files
    pub fn new() -> Self {
        Self::with_key_store(Arc::new(PemFileKeyStore))
    }

    /// Create a validator over a custom key store
    pub fn with_key_store(keys: Arc<dyn KeyStore>) -> Self {
        Self { keys }
    }

    /// Run the self-check against the current clock
    pub fn validate(
        &self,
        options: &ValidationOptions,
        preview: Option<&SignaturePreview>,
    ) -> Result<()> {
        self.validate_at(options, preview, chrono::Utc::now().timestamp_millis())
    }

    /// Run the self-check against `now_ms` (Unix milliseconds)
    pub fn validate_at(
        &self,
        options: &ValidationOptions,
        preview: Option<&SignaturePreview>,
        now_ms: i64,
    ) -> Result<()> {
        let Some(public_key_path) = options.public_key_path() else {
            return Ok(());
        };
        options.check()?;

        let preview = preview.ok_or_else(|| {
            WebhookError::config("public key verification requires a computed signature")
        })?;
        if !preview.algorithm.is_asymmetric() {
            return Err(WebhookError::config(format!(
                "public key verification is not defined for {}",
                preview.algorithm
            )));
        }

        self.keys
            .public_key(public_key_path)?
            .verify(&preview.message, &preview.signature)?;
        debug!(algorithm = %preview.algorithm, "Signature verified against public key");

        if options.timestamp_header().is_some() && options.max_skew_ms > 0 {
            let timestamp = options
                .timestamp_value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .or(preview.timestamp.as_deref())
                .ok_or_else(|| {
                    WebhookError::TimestampInvalid("no timestamp available to check".to_string())
                })?;
            check_timestamp_skew(timestamp, options.max_skew_ms, now_ms)?;
        }

        Ok(())
    }
}

/// Interpret a timestamp as Unix milliseconds
///
/// Values with at most ten digits are taken as seconds, anything longer as
/// milliseconds. Second-denominated values past the year 2286 therefore read
/// as milliseconds.
pub fn timestamp_millis(timestamp: &str) -> Result<i64> {
    let trimmed = timestamp.trim();
    let value: i64 = trimmed.parse().map_err(|_| {
        WebhookError::TimestampInvalid(format!("timestamp {trimmed:?} is not an integer"))
    })?;

    let digits = trimmed.trim_start_matches(['-', '+']).len();
    if digits <= SECONDS_MAX_DIGITS {
        value.checked_mul(1000).ok_or_else(|| {
            WebhookError::TimestampInvalid(format!("timestamp {trimmed:?} is out of range"))
        })
    } else {
        Ok(value)
    }
}

/// Fail when `timestamp` is more than `max_skew_ms` away from `now_ms`
pub fn check_timestamp_skew(timestamp: &str, max_skew_ms: i64, now_ms: i64) -> Result<()> {
    let timestamp_ms = timestamp_millis(timestamp)?;
    let skew = now_ms.abs_diff(timestamp_ms);
    if skew > max_skew_ms.unsigned_abs() {
        return Err(WebhookError::TimestampInvalid(format!(
            "timestamp skew {skew}ms exceeds the allowed {max_skew_ms}ms"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{PrivateKey, PublicKey};
    use crate::SignatureAlgorithm;
    use std::collections::HashMap;
    use std::path::Path;

    /// In-memory key store keyed by path
    #[derive(Default)]
    struct MemoryKeys {
        public: HashMap<PathBuf, PublicKey>,
    }

    impl KeyStore for MemoryKeys {
        fn private_key(&self, path: &Path) -> Result<PrivateKey> {
            Err(WebhookError::KeyError(format!("no private key at {}", path.display())))
        }

        fn public_key(&self, path: &Path) -> Result<PublicKey> {
            self.public
                .get(path)
                .cloned()
                .ok_or_else(|| WebhookError::KeyError(format!("no public key at {}", path.display())))
        }
    }

    const NOW_MS: i64 = 1_700_000_000_000;

    fn signed_preview(timestamp: Option<&str>) -> (SignatureValidator, SignaturePreview) {
        use p256::pkcs8::{EncodePrivateKey, LineEnding};

        let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
        let private = PrivateKey::from_pem(&secret.to_pkcs8_pem(LineEnding::LF).unwrap()).unwrap();
        let message = crate::signed_message(timestamp, b"{\"a\":1}");
        let preview = SignaturePreview {
            algorithm: SignatureAlgorithm::EcdsaP256,
            signature: private.sign(&message).unwrap(),
            message,
            timestamp: timestamp.map(str::to_string),
        };

        let other = p256::SecretKey::random(&mut rand::rngs::OsRng);
        let other_pem = other.to_pkcs8_pem(LineEnding::LF).unwrap();
        let mut keys = MemoryKeys::default();
        keys.public.insert("match.pem".into(), private.public_key());
        keys.public.insert(
            "other.pem".into(),
            PrivateKey::from_pem(&other_pem).unwrap().public_key(),
        );
        (SignatureValidator::with_key_store(Arc::new(keys)), preview)
    }

    fn options(key: &str) -> ValidationOptions {
        ValidationOptions {
            validate_only: true,
            public_key_path: Some(key.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_public_key_is_noop() {
        let validator = SignatureValidator::new();
        assert!(validator.validate(&ValidationOptions::default(), None).is_ok());
    }

    #[test]
    fn test_public_key_requires_validate_only() {
        let (validator, preview) = signed_preview(None);
        let options = ValidationOptions {
            validate_only: false,
            ..options("match.pem")
        };
        let err = validator.validate(&options, Some(&preview)).unwrap_err();
        assert!(matches!(err, WebhookError::ConfigError(_)));
    }

    #[test]
    fn test_requires_preview() {
        let (validator, _) = signed_preview(None);
        let err = validator.validate(&options("match.pem"), None).unwrap_err();
        assert!(matches!(err, WebhookError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_hmac_preview() {
        let (validator, mut preview) = signed_preview(None);
        preview.algorithm = SignatureAlgorithm::HmacSha256;
        let err = validator.validate(&options("match.pem"), Some(&preview)).unwrap_err();
        assert!(err.to_string().contains("hmac-sha256"));
    }

    #[test]
    fn test_matching_key_verifies() {
        let (validator, preview) = signed_preview(None);
        assert!(validator.validate(&options("match.pem"), Some(&preview)).is_ok());
    }

    #[test]
    fn test_mismatched_key_is_explicit_error() {
        let (validator, preview) = signed_preview(None);
        let err = validator.validate(&options("other.pem"), Some(&preview)).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureInvalid(_)));
    }

    #[test]
    fn test_skew_uses_preview_timestamp() {
        let (validator, preview) = signed_preview(Some("1699999990"));
        let options = ValidationOptions {
            timestamp_header: Some("X-Timestamp".to_string()),
            max_skew_ms: 5000,
            ..options("match.pem")
        };
        let err = validator
            .validate_at(&options, Some(&preview), NOW_MS)
            .unwrap_err();
        assert!(matches!(err, WebhookError::TimestampInvalid(_)));

        let fresh = ValidationOptions {
            max_skew_ms: 20_000,
            ..options
        };
        assert!(validator.validate_at(&fresh, Some(&preview), NOW_MS).is_ok());
    }

    #[test]
    fn test_skew_disabled_without_header_or_limit() {
        let (validator, preview) = signed_preview(Some("1"));
        let no_limit = ValidationOptions {
            timestamp_header: Some("X-Timestamp".to_string()),
            ..options("match.pem")
        };
        assert!(validator.validate_at(&no_limit, Some(&preview), NOW_MS).is_ok());

        let no_header = ValidationOptions {
            max_skew_ms: 5000,
            ..options("match.pem")
        };
        assert!(validator.validate_at(&no_header, Some(&preview), NOW_MS).is_ok());
    }

    #[test]
    fn test_skew_missing_timestamp() {
        let (validator, preview) = signed_preview(None);
        let options = ValidationOptions {
            timestamp_header: Some("X-Timestamp".to_string()),
            max_skew_ms: 5000,
            ..options("match.pem")
        };
        let err = validator
            .validate_at(&options, Some(&preview), NOW_MS)
            .unwrap_err();
        assert!(matches!(err, WebhookError::TimestampInvalid(_)));
    }

    #[test]
    fn test_timestamp_unit_heuristic() {
        assert_eq!(timestamp_millis("1700000000").unwrap(), 1_700_000_000_000);
        assert_eq!(timestamp_millis("1700000000123").unwrap(), 1_700_000_000_123);
        assert_eq!(timestamp_millis("42").unwrap(), 42_000);
        assert!(timestamp_millis("soon").is_err());
        assert!(timestamp_millis("").is_err());
    }

    #[test]
    fn test_check_timestamp_skew() {
        assert!(check_timestamp_skew("1699999999", 5000, NOW_MS).is_ok());
        assert!(check_timestamp_skew("1699999990", 5000, NOW_MS).is_err());
        assert!(check_timestamp_skew("1700000004000", 5000, NOW_MS).is_ok());
        assert!(check_timestamp_skew("1700000010", 5000, NOW_MS).is_err());
    }
}
