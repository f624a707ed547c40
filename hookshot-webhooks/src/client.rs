//! Webhook client: builds, signs, self-checks and sends one webhook

use crate::keys::KeyStore;
use crate::{
    AuthOptions, AuthScheme, DispatchOptions, DispatchOutcome, Dispatcher, EndpointKind,
    PayloadBuilder, PayloadOptions, PayloadSource, RestClient, Result, SignatureEngine,
    SignaturePreview, SignatureSpec, SigningOptions, SignatureValidator, TimestampBinding,
    ValidationOptions, WebhookConfig, WebhookError, WebhookPayload,
};
use hookshot_http_client::{HttpClient, HttpClientConfig};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use tracing::{debug, info};

/// Parse a `Name: value` header argument
pub fn parse_header(arg: &str) -> Result<(String, String)> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| WebhookError::config(format!("header {arg:?} must look like Name: value")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(WebhookError::config(format!("header {arg:?} has an empty name")));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Everything one send needs
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub payload: PayloadOptions,

    /// Extra headers, applied before any header the engine sets
    pub headers: Vec<(String, String)>,

    pub auth: AuthOptions,
    pub signing: SigningOptions,

    /// Self-check inputs; `validate_only` is taken from [`DispatchOptions`]
    /// and the timestamp header and value from [`SigningOptions`]
    pub validation: ValidationOptions,

    pub dispatch: DispatchOptions,
}

/// Options resolved into sum types, before any file is touched
#[derive(Debug)]
struct ResolvedSend {
    source: PayloadSource,
    headers: HeaderMap,
    auth: Option<AuthScheme>,
    signature: Option<(SignatureSpec, Option<TimestampBinding>)>,
    validation: ValidationOptions,
}

impl SendOptions {
    /// Run every configuration check without reading files or signing
    pub fn check(&self, config: &WebhookConfig) -> Result<()> {
        self.resolve(config).map(|_| ())
    }

    fn validation(&self) -> Result<ValidationOptions> {
        let timestamp_header = shared_option(
            "timestamp header",
            &self.signing.timestamp_header,
            &self.validation.timestamp_header,
            |a, b| a.eq_ignore_ascii_case(b),
        )?;
        let timestamp_value = shared_option(
            "timestamp value",
            &self.signing.timestamp_value,
            &self.validation.timestamp_value,
            |a, b| a == b,
        )?;
        Ok(ValidationOptions {
            validate_only: self.dispatch.validate_only,
            timestamp_header,
            timestamp_value,
            ..self.validation.clone()
        })
    }

    fn resolve(&self, config: &WebhookConfig) -> Result<ResolvedSend> {
        let source = PayloadSource::from_options(&self.payload)?;
        let headers = user_headers(&self.headers)?;
        let auth = AuthScheme::from_options(&self.auth, config)?;
        let signature = self.signing.resolve(config)?;

        let validation = self.validation()?;
        validation.check()?;
        if validation.public_key_path.is_some() {
            match &signature {
                None => {
                    return Err(WebhookError::config(
                        "public key verification requires a signature algorithm",
                    ));
                }
                Some((spec, _)) if !spec.scheme.algorithm().is_asymmetric() => {
                    return Err(WebhookError::config(format!(
                        "public key verification is not defined for {}",
                        spec.scheme.algorithm()
                    )));
                }
                Some(_) => {}
            }
        }

        self.dispatch.check()?;
        let endpoint = self.dispatch.endpoint();
        endpoint.path(&self.dispatch.workspace, &self.dispatch.event_path)?;
        if endpoint == EndpointKind::Draft && auth.as_ref().is_some_and(AuthScheme::uses_authorization_header) {
            return Err(WebhookError::config(
                "the draft endpoint authenticates with the session token; bearer and basic auth cannot be used",
            ));
        }

        Ok(ResolvedSend {
            source,
            headers,
            auth,
            signature,
            validation,
        })
    }
}

/// The signed value wins; the self-check may only repeat it
fn shared_option(
    what: &str,
    signing: &Option<String>,
    validation: &Option<String>,
    same: impl Fn(&str, &str) -> bool,
) -> Result<Option<String>> {
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    match (non_blank(signing), non_blank(validation)) {
        (Some(signed), Some(checked)) if !same(&signed, &checked) => Err(WebhookError::config(
            format!("the {what} to check differs from the one that is signed"),
        )),
        (Some(signed), _) => Ok(Some(signed)),
        (None, checked) => Ok(checked),
    }
}

fn user_headers(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::try_from(name.trim())
            .map_err(|_| WebhookError::config(format!("invalid header name {name:?}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| WebhookError::config(format!("invalid value for header {name}")))?;
        map.append(name, value);
    }
    Ok(map)
}

/// A wire-ready webhook
#[derive(Debug, Clone)]
pub struct PreparedWebhook {
    pub payload: WebhookPayload,
    pub headers: HeaderMap,

    /// Auth query parameters; endpoint flags are added on dispatch
    pub query: Vec<(String, String)>,

    /// Present when the payload was signed
    pub preview: Option<SignaturePreview>,

    pub endpoint: EndpointKind,
}

/// Per-invocation webhook engine
#[derive(Debug, Clone)]
pub struct WebhookClient {
    config: WebhookConfig,
    signer: SignatureEngine,
    validator: SignatureValidator,
    dispatcher: Dispatcher,
}

impl WebhookClient {
    /// Create a client over any transport
    pub fn new(config: WebhookConfig, rest: Arc<dyn RestClient>) -> Self {
        Self {
            config,
            signer: SignatureEngine::new(),
            validator: SignatureValidator::new(),
            dispatcher: Dispatcher::new(rest),
        }
    }

    /// Create a client that sends through a fresh [`HttpClient`]
    pub fn with_http_config(config: WebhookConfig, http: HttpClientConfig) -> Result<Self> {
        let http = HttpClient::new(http).map_err(|e| WebhookError::config(e.to_string()))?;
        Ok(Self::new(config, Arc::new(http)))
    }

    /// Load keys from `keys` instead of PEM files
    pub fn with_key_store(mut self, keys: Arc<dyn KeyStore>) -> Self {
        self.signer = SignatureEngine::with_key_store(keys.clone());
        self.validator = SignatureValidator::with_key_store(keys);
        self
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Build, authenticate, sign and self-check without sending
    pub fn prepare(&self, options: &SendOptions) -> Result<PreparedWebhook> {
        let resolved = options.resolve(&self.config)?;

        let payload = PayloadBuilder::new(&self.config)
            .build_source(&resolved.source, options.payload.content_type.as_deref())?;

        let mut headers = resolved.headers;
        let content_type = HeaderValue::from_str(&payload.content_type).map_err(|_| {
            WebhookError::config(format!("invalid content type {:?}", payload.content_type))
        })?;
        headers.insert(CONTENT_TYPE, content_type);

        let mut query = Vec::new();
        if let Some(auth) = &resolved.auth {
            auth.apply(&mut headers, &mut query)?;
        }

        let preview = match &resolved.signature {
            Some((spec, timestamp)) => Some(self.signer.sign(
                &mut headers,
                &payload.body,
                spec,
                timestamp.as_ref(),
            )?),
            None => None,
        };

        self.validator
            .validate(&resolved.validation, preview.as_ref())?;

        let endpoint = options.dispatch.endpoint();
        debug!(
            %endpoint,
            content_type = %payload.content_type,
            bytes = payload.body.len(),
            signed = preview.is_some(),
            "Prepared webhook"
        );

        Ok(PreparedWebhook {
            payload,
            headers,
            query,
            preview,
            endpoint,
        })
    }

    /// Prepare and send; the response is classified by status
    pub async fn send(&self, options: &SendOptions) -> Result<DispatchOutcome> {
        let prepared = self.prepare(options)?;
        let outcome = self
            .dispatcher
            .dispatch(
                &options.dispatch,
                &self.config,
                prepared.payload.body,
                prepared.headers,
                prepared.query,
            )
            .await?;
        info!(endpoint = %outcome.endpoint, status = outcome.status, "Webhook sent");
        Ok(outcome)
    }
}
