use hookshot_http_client::{HttpClient, HttpClientConfig, HttpClientError, SessionToken};
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, session: Option<&str>) -> HttpClient {
    let mut builder = HttpClientConfig::builder()
        .base_url(format!("{}/w/", server.uri()))
        .timeout(Duration::from_millis(500));
    if let Some(token) = session {
        builder = builder.session_token(token);
    }
    HttpClient::new(builder.build()).unwrap()
}

#[tokio::test]
async fn test_post_sends_body_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/w/acme/events/orders"))
        .and(query_param("token", "k-1"))
        .and(header("X-Signature", "abc"))
        .and(body_bytes(br#"{"orderId":"o-1"}"#.to_vec()))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"runId": "r-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, None)
        .post("acme/events/orders")
        .query("token", "k-1")
        .header("X-Signature", "abc")
        .body(br#"{"orderId":"o-1"}"#.to_vec())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 202);
    assert_eq!(response.decoded(), json!({"runId": "r-1"}));
}

#[tokio::test]
async fn test_required_session_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer sess-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, Some("sess-1"))
        .post("acme/api/events/draft/orders")
        .session(SessionToken::Required)
        .send()
        .await
        .unwrap();
    assert!(response.is_success());
    assert!(response.decoded().is_null());
}

#[tokio::test]
async fn test_required_session_missing_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, None)
        .post("acme/api/events/draft/orders")
        .session(SessionToken::Required)
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, HttpClientError::MissingSession));
}

#[tokio::test]
async fn test_error_status_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad payload"))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, None).post("acme/events/x").send().await.unwrap();
    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(response.decoded(), json!("bad payload"));
}

#[tokio::test]
async fn test_timeout_is_reported_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, None).post("acme/events/slow").send().await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_request_timeout_overrides_client_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(400)))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(format!("{}/w/", server.uri()))
        .timeout(Duration::from_secs(5))
        .build();
    let err = HttpClient::new(config)
        .unwrap()
        .post("acme/events/slow")
        .timeout(Duration::from_millis(100))
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, HttpClientError::Timeout(d) if d == Duration::from_millis(100)));
}

/// Collects formatted log lines in memory
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn test_query_credentials_are_not_logged() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("hookshot_http_client=debug"))
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("token", "SUPER-SECRET-KEY"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, None)
        .post("acme/events/orders")
        .query("token", "SUPER-SECRET-KEY")
        .send()
        .await
        .unwrap();

    let output = logs.contents();
    assert!(output.contains("/w/acme/events/orders"));
    assert!(!output.contains("SUPER-SECRET-KEY"));
}
