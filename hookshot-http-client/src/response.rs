//! HTTP response wrapper.

use crate::{HttpClientError, Result};
use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;

/// Status and fully read body of one response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    body: Bytes,
}

impl Response {
    /// Create a response from a reqwest response, reading the full body.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpClientError::Http(e.without_url()))?;

        Ok(Self { status, body })
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decoded body: JSON when it parses, otherwise the lossy text as a JSON
    /// string, `null` when empty.
    pub fn decoded(&self) -> Value {
        decode_body(&self.body)
    }
}

fn decode_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
        assert_eq!(decode_body(br#"{"ok":true}"#), json!({"ok": true}));
        assert_eq!(decode_body(b"accepted"), json!("accepted"));
    }
}
