//! Webhook payload construction
//!
//! Turns one [`PayloadSource`] into wire bytes, a content type and a
//! human-inspectable input map.

use crate::{Result, WebhookConfig, WebhookError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Value recorded in the input map in place of a file's server-side handle,
/// which is only assigned once the upload has been received.
pub const FILE_PATH_PLACEHOLDER: &str = "<placeholder>";

const EXCERPT_LEN: usize = 64;

/// A built payload ready for signing
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookPayload {
    /// Exact request body bytes
    pub body: Vec<u8>,

    /// Value for the `Content-Type` header
    pub content_type: String,

    /// Semantic view of the body, not necessarily a byte-exact decode
    pub input_map: Map<String, Value>,
}

/// One plain `key=value` form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    /// Create a new form field
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse a `key=value` argument; the value may itself contain `=`
    pub fn parse(arg: &str) -> Result<Self> {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| WebhookError::config(format!("form field must be key=value, got {arg:?}")))?;
        if name.is_empty() {
            return Err(WebhookError::config(format!("form field has an empty name: {arg:?}")));
        }
        Ok(Self::new(name, value))
    }
}

/// A multipart file entry as requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    /// Form field name
    pub field: String,

    /// File to upload
    pub path: PathBuf,

    /// Explicit content type; inferred from the extension when absent
    pub content_type: Option<String>,
}

impl FileField {
    /// Create a new file field with an inferred content type
    pub fn new(field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field: field.into(),
            path: path.into(),
            content_type: None,
        }
    }

    /// Set an explicit content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Parse a `field=path` argument with an optional `;type=mime` suffix
    pub fn parse(arg: &str) -> Result<Self> {
        let (field, rest) = arg
            .split_once('=')
            .ok_or_else(|| WebhookError::config(format!("file must be field=path, got {arg:?}")))?;
        let (path, content_type) = match rest.rsplit_once(";type=") {
            Some((path, ct)) if !ct.is_empty() => (path, Some(ct.to_string())),
            _ => (rest, None),
        };
        if field.is_empty() || path.is_empty() {
            return Err(WebhookError::config(format!("file must be field=path, got {arg:?}")));
        }
        Ok(Self {
            field: field.to_string(),
            path: PathBuf::from(path),
            content_type,
        })
    }
}

/// A resolved multipart file entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub path: PathBuf,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl FilePart {
    /// Stat the file and resolve its name and content type
    pub fn resolve(file: &FileField) -> Result<Self> {
        let metadata = std::fs::metadata(&file.path).map_err(|e| WebhookError::io(&file.path, e))?;
        let filename = file
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                WebhookError::config(format!("invalid file name: {}", file.path.display()))
            })?
            .to_string();

        let content_type = match &file.content_type {
            Some(ct) => ct.clone(),
            None => mime_guess::from_path(&file.path)
                .first_or_octet_stream()
                .to_string(),
        };

        Ok(Self {
            field: file.field.clone(),
            path: file.path.clone(),
            filename,
            content_type,
            size_bytes: metadata.len(),
        })
    }

    /// Input-map descriptor for this file
    pub fn descriptor(&self) -> Value {
        serde_json::json!({
            "filename": self.filename,
            "contentType": self.content_type,
            "sizeBytes": self.size_bytes,
            "path": FILE_PATH_PLACEHOLDER,
        })
    }
}

/// Flag-level payload inputs, at most one source of which may be set
#[derive(Debug, Clone, Default)]
pub struct PayloadOptions {
    /// Inline JSON text
    pub json: Option<String>,

    /// Path to a JSON document
    pub json_file: Option<PathBuf>,

    /// Path to a file sent verbatim
    pub raw_file: Option<PathBuf>,

    /// Plain form fields
    pub form_fields: Vec<FormField>,

    /// Multipart file entries
    pub files: Vec<FileField>,

    /// Content-type override for JSON and raw payloads
    pub content_type: Option<String>,
}

/// The single active payload source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    /// Inline JSON text
    Json(String),

    /// JSON read from a file
    JsonFile(PathBuf),

    /// File bytes sent verbatim
    RawFile(PathBuf),

    /// URL-encoded form, or multipart when any files are present
    Form {
        fields: Vec<FormField>,
        files: Vec<FileField>,
    },
}

impl PayloadSource {
    /// Resolve the one selected source, without touching the filesystem
    pub fn from_options(options: &PayloadOptions) -> Result<Self> {
        let has_form = !options.form_fields.is_empty() || !options.files.is_empty();
        let selected = [
            options.json.is_some(),
            options.json_file.is_some(),
            options.raw_file.is_some(),
            has_form,
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        match selected {
            0 => Err(WebhookError::config(
                "no payload given: provide inline JSON, a JSON file, a raw file, or form fields/files",
            )),
            1 => Ok(if let Some(json) = &options.json {
                Self::Json(json.clone())
            } else if let Some(path) = &options.json_file {
                Self::JsonFile(path.clone())
            } else if let Some(path) = &options.raw_file {
                Self::RawFile(path.clone())
            } else {
                check_part_headers(&options.form_fields, &options.files)?;
                Self::Form {
                    fields: options.form_fields.clone(),
                    files: options.files.clone(),
                }
            }),
            _ => Err(WebhookError::config(
                "payload sources are mutually exclusive: choose one of inline JSON, JSON file, raw file, or form fields/files",
            )),
        }
    }
}

/// Part names, filenames and content types end up in multipart part headers
fn check_part_headers(fields: &[FormField], files: &[FileField]) -> Result<()> {
    for field in fields {
        header_safe("form field name", &field.name)?;
    }
    for file in files {
        header_safe("file field name", &file.field)?;
        if let Some(name) = file.path.file_name().and_then(|n| n.to_str()) {
            header_safe("file name", name)?;
        }
        if let Some(content_type) = &file.content_type {
            header_safe("content type", content_type)?;
            content_type.parse::<mime::Mime>().map_err(|e| {
                WebhookError::config(format!("invalid content type {content_type:?}: {e}"))
            })?;
        }
    }
    Ok(())
}

fn header_safe(what: &str, value: &str) -> Result<()> {
    if value.chars().any(char::is_control) {
        return Err(WebhookError::config(format!(
            "{what} {value:?} contains control characters"
        )));
    }
    Ok(())
}

/// Builds [`WebhookPayload`]s using the configured default content types
#[derive(Debug, Clone)]
pub struct PayloadBuilder<'a> {
    config: &'a WebhookConfig,
}

impl<'a> PayloadBuilder<'a> {
    /// Create a builder over the given defaults
    pub fn new(config: &'a WebhookConfig) -> Self {
        Self { config }
    }

    /// Resolve the options to one source and build it
    pub fn build(&self, options: &PayloadOptions) -> Result<WebhookPayload> {
        let source = PayloadSource::from_options(options)?;
        self.build_source(&source, options.content_type.as_deref())
    }

    /// Build an already resolved source
    pub fn build_source(
        &self,
        source: &PayloadSource,
        content_type: Option<&str>,
    ) -> Result<WebhookPayload> {
        let content_type = content_type.map(str::trim).filter(|ct| !ct.is_empty());

        let payload = match source {
            PayloadSource::Json(text) => {
                self.json_payload(text.as_bytes().to_vec(), "inline JSON", content_type)?
            }
            PayloadSource::JsonFile(path) => {
                let bytes = read_file(path)?;
                self.json_payload(bytes, &path.display().to_string(), content_type)?
            }
            PayloadSource::RawFile(path) => WebhookPayload {
                body: read_file(path)?,
                content_type: content_type
                    .unwrap_or(&self.config.raw_content_type)
                    .to_string(),
                input_map: Map::new(),
            },
            PayloadSource::Form { fields, files } if files.is_empty() => {
                urlencoded_payload(fields)?
            }
            PayloadSource::Form { fields, files } => multipart_payload(fields, files)?,
        };

        debug!(
            content_type = %payload.content_type,
            bytes = payload.body.len(),
            "Built webhook payload"
        );
        Ok(payload)
    }

    fn json_payload(
        &self,
        body: Vec<u8>,
        origin: &str,
        content_type: Option<&str>,
    ) -> Result<WebhookPayload> {
        let decoded: Value = serde_json::from_slice(&body).map_err(|e| {
            WebhookError::PayloadError(format!(
                "invalid JSON in {origin} ({e}): {}",
                excerpt(&body)
            ))
        })?;

        let input_map = match decoded {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        Ok(WebhookPayload {
            body,
            content_type: content_type
                .unwrap_or(&self.config.json_content_type)
                .to_string(),
            input_map,
        })
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| WebhookError::io(path, e))
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{:?}...", &trimmed[..idx]),
        None => format!("{trimmed:?}"),
    }
}

/// Insert `value` under `key`, turning repeated keys into a list in order of appearance
fn insert_repeated(map: &mut Map<String, Value>, key: &str, value: Value) {
    match map.get_mut(key) {
        None => {
            map.insert(key.to_string(), value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

fn urlencoded_payload(fields: &[FormField]) -> Result<WebhookPayload> {
    let pairs: Vec<(&str, &str)> = fields
        .iter()
        .map(|f| (f.name.as_str(), f.value.as_str()))
        .collect();
    let body = serde_urlencoded::to_string(&pairs)
        .map_err(|e| WebhookError::PayloadError(format!("failed to encode form: {e}")))?;

    let mut input_map = Map::new();
    for field in fields {
        insert_repeated(&mut input_map, &field.name, Value::String(field.value.clone()));
    }

    Ok(WebhookPayload {
        body: body.into_bytes(),
        content_type: "application/x-www-form-urlencoded".to_string(),
        input_map,
    })
}

fn multipart_payload(fields: &[FormField], files: &[FileField]) -> Result<WebhookPayload> {
    check_part_headers(fields, files)?;
    let boundary = format!("hookshot{}", uuid::Uuid::new_v4().simple());
    let mut body = Vec::new();
    let mut input_map = Map::new();

    for field in fields {
        let head = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
            escape_quotes(&field.name)
        );
        body.extend_from_slice(head.as_bytes());
        body.extend_from_slice(field.value.as_bytes());
        body.extend_from_slice(b"\r\n");
        insert_repeated(&mut input_map, &field.name, Value::String(field.value.clone()));
    }

    for file in files {
        let part = FilePart::resolve(file)?;
        let contents = read_file(&part.path)?;

        let head = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            escape_quotes(&part.field),
            escape_quotes(&part.filename),
            part.content_type
        );
        body.extend_from_slice(head.as_bytes());
        body.extend_from_slice(&contents);
        body.extend_from_slice(b"\r\n");
        insert_repeated(&mut input_map, &part.field, part.descriptor());
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Ok(WebhookPayload {
        body,
        content_type: format!("multipart/form-data; boundary={boundary}"),
        input_map,
    })
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
