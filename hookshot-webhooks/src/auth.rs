//! Per-request credentials

use crate::{Result, WebhookConfig, WebhookError};
use base64::Engine;
use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Where an API key is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyLocation {
    /// In the named header
    Header(String),

    /// In the named query parameter
    Query(String),
}

/// The single credential scheme attached to a request
#[derive(Debug, Clone)]
pub enum AuthScheme {
    ApiKey {
        key: SecretString,
        location: ApiKeyLocation,
    },
    Bearer(SecretString),
    /// Raw `user:pass` credentials
    Basic(SecretString),
}

/// Flag-level auth inputs
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    pub api_key: Option<SecretString>,
    pub bearer: Option<SecretString>,
    /// `user:pass`
    pub basic: Option<SecretString>,
    /// API-key header name override
    pub api_key_header: Option<String>,
    /// `header` (default) or `query`
    pub api_key_location: Option<String>,
    /// API-key query parameter override
    pub api_key_query_param: Option<String>,
}

fn non_empty(secret: &Option<SecretString>) -> Option<&SecretString> {
    secret
        .as_ref()
        .filter(|s| !s.expose_secret().trim().is_empty())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AuthScheme {
    /// Resolve at most one scheme from the options
    pub fn from_options(options: &AuthOptions, config: &WebhookConfig) -> Result<Option<Self>> {
        let api_key = non_empty(&options.api_key);
        let bearer = non_empty(&options.bearer);
        let basic = non_empty(&options.basic);

        let selected = [api_key.is_some(), bearer.is_some(), basic.is_some()]
            .into_iter()
            .filter(|set| *set)
            .count();
        if selected > 1 {
            return Err(WebhookError::config(
                "auth schemes are mutually exclusive: choose one of API key, bearer token, or basic auth",
            ));
        }

        if let Some(key) = api_key {
            let location = match non_blank(&options.api_key_location)
                .map(str::to_ascii_lowercase)
                .as_deref()
            {
                None | Some("header") => ApiKeyLocation::Header(
                    non_blank(&options.api_key_header)
                        .unwrap_or(&config.api_key_header)
                        .to_string(),
                ),
                Some("query") => ApiKeyLocation::Query(
                    non_blank(&options.api_key_query_param)
                        .unwrap_or(&config.api_key_query_param)
                        .to_string(),
                ),
                Some(other) => {
                    return Err(WebhookError::config(format!(
                        "unsupported API key location {other:?} (expected header or query)"
                    )));
                }
            };
            return Ok(Some(Self::ApiKey {
                key: key.clone(),
                location,
            }));
        }

        if let Some(token) = bearer {
            return Ok(Some(Self::Bearer(token.clone())));
        }

        if let Some(credentials) = basic {
            if !credentials.expose_secret().contains(':') {
                return Err(WebhookError::config(
                    "basic auth must be given as user:pass",
                ));
            }
            return Ok(Some(Self::Basic(credentials.clone())));
        }

        Ok(None)
    }

    /// Whether this scheme occupies the `Authorization` header
    pub fn uses_authorization_header(&self) -> bool {
        matches!(self, Self::Bearer(_) | Self::Basic(_))
    }

    /// Add this scheme's credential to the outgoing headers or query
    pub fn apply(&self, headers: &mut HeaderMap, query: &mut Vec<(String, String)>) -> Result<()> {
        match self {
            Self::ApiKey {
                key,
                location: ApiKeyLocation::Header(name),
            } => {
                let name = HeaderName::try_from(name.as_str()).map_err(|_| {
                    WebhookError::config(format!("invalid API key header name {name:?}"))
                })?;
                headers.insert(name, sensitive_value(key.expose_secret())?);
            }
            Self::ApiKey {
                key,
                location: ApiKeyLocation::Query(param),
            } => {
                query.push((param.clone(), key.expose_secret().to_string()));
            }
            Self::Bearer(token) => {
                headers.insert(
                    AUTHORIZATION,
                    sensitive_value(&format!("Bearer {}", token.expose_secret()))?,
                );
            }
            Self::Basic(credentials) => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(credentials.expose_secret().as_bytes());
                headers.insert(AUTHORIZATION, sensitive_value(&format!("Basic {encoded}"))?);
            }
        }
        Ok(())
    }
}

fn sensitive_value(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| WebhookError::config("credential contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Resolve and apply the auth options in one step; a no-op when none are set
pub fn apply_auth(
    headers: &mut HeaderMap,
    query: &mut Vec<(String, String)>,
    options: &AuthOptions,
    config: &WebhookConfig,
) -> Result<()> {
    if let Some(scheme) = AuthScheme::from_options(options, config)? {
        scheme.apply(headers, query)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> Option<SecretString> {
        Some(SecretString::from(value.to_string()))
    }

    fn apply(options: &AuthOptions) -> Result<(HeaderMap, Vec<(String, String)>)> {
        let mut headers = HeaderMap::new();
        let mut query = Vec::new();
        apply_auth(&mut headers, &mut query, options, &WebhookConfig::default())?;
        Ok((headers, query))
    }

    #[test]
    fn test_no_auth_is_noop() {
        let (headers, query) = apply(&AuthOptions::default()).unwrap();
        assert!(headers.is_empty());
        assert!(query.is_empty());
    }

    #[test]
    fn test_api_key_header_default() {
        let options = AuthOptions {
            api_key: secret("k-123"),
            ..Default::default()
        };
        let (headers, query) = apply(&options).unwrap();
        assert_eq!(headers["x-api-key"], "k-123");
        assert!(headers["x-api-key"].is_sensitive());
        assert!(query.is_empty());
    }

    #[test]
    fn test_api_key_custom_header() {
        let options = AuthOptions {
            api_key: secret("k-123"),
            api_key_header: Some("X-Hook-Key".to_string()),
            ..Default::default()
        };
        let (headers, _) = apply(&options).unwrap();
        assert_eq!(headers["x-hook-key"], "k-123");
    }

    #[test]
    fn test_api_key_query_mode() {
        let options = AuthOptions {
            api_key: secret("k-123"),
            api_key_location: Some("QUERY".to_string()),
            ..Default::default()
        };
        let (headers, query) = apply(&options).unwrap();
        assert!(headers.is_empty());
        assert_eq!(query, vec![("token".to_string(), "k-123".to_string())]);
    }

    #[test]
    fn test_api_key_bad_location() {
        let options = AuthOptions {
            api_key: secret("k-123"),
            api_key_location: Some("cookie".to_string()),
            ..Default::default()
        };
        assert!(matches!(apply(&options), Err(WebhookError::ConfigError(_))));
    }

    #[test]
    fn test_bearer() {
        let options = AuthOptions {
            bearer: secret("tok"),
            ..Default::default()
        };
        let (headers, _) = apply(&options).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
    }

    #[test]
    fn test_basic() {
        let options = AuthOptions {
            basic: secret("user:pass"),
            ..Default::default()
        };
        let (headers, _) = apply(&options).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_basic_without_colon_fails_fast() {
        let options = AuthOptions {
            basic: secret("justauser"),
            ..Default::default()
        };
        assert!(matches!(apply(&options), Err(WebhookError::ConfigError(_))));
    }

    #[test]
    fn test_multiple_schemes_rejected() {
        let options = AuthOptions {
            api_key: secret("key-material-1"),
            bearer: secret("token-material-2"),
            ..Default::default()
        };
        let err = apply(&options).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
        assert!(!err.to_string().contains("material"));
    }

    #[test]
    fn test_empty_values_do_not_count() {
        let options = AuthOptions {
            api_key: secret(""),
            bearer: secret("t"),
            ..Default::default()
        };
        let (headers, _) = apply(&options).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer t");
    }
}
