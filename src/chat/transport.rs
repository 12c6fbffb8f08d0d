//! HTTP transport for the chat client.
//!
//! The client only needs one operation, a JSON POST, so that is all the
//! [`Transport`] trait exposes. Tests substitute their own implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::error::Error as StdError;
use std::io::ErrorKind;
use thiserror::Error;

/// Status and body text of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Failures before a complete response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to '{url}' timed out")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("connection refused by '{url}'; check that the server is running and AI_ASK_BASE_URL is correct")]
    ConnectionRefused {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to connect to '{url}'; check AI_ASK_BASE_URL and network connectivity")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Classify a reqwest failure into something the user can act on.
    fn from_reqwest(source: reqwest::Error, url: &str) -> Self {
        let url = url.to_string();
        if source.is_timeout() || error_chain_has_kind(&source, ErrorKind::TimedOut) {
            return Self::Timeout { url, source };
        }
        if source.is_connect() {
            if error_chain_has_kind(&source, ErrorKind::ConnectionRefused) {
                return Self::ConnectionRefused { url, source };
            }
            return Self::Connect { url, source };
        }
        Self::Request { url, source }
    }
}

fn error_chain_has_kind(err: &(dyn StdError + 'static), kind: ErrorKind) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
            if io_err.kind() == kind {
                return true;
            }
        }
        current = source.source();
    }
    false
}

/// The single network operation the chat client needs.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` with the given headers and return status and body.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client with default timeouts.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("ask/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(e, url))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn free_local_addr() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn test_posts_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("content-type", "application/json"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_string(r#"{"hello":"world"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let url = format!("{}/v1/chat/completions", server.uri());
        let headers = [
            ("Content-Type", "application/json".to_string()),
            ("Authorization", "Bearer sk-test".to_string()),
        ];
        let response = transport
            .post_json(&url, &headers, br#"{"hello":"world"}"#.to_vec())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "ok");
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let response = transport
            .post_json(&server.uri(), &[], Vec::new())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.body, "rate limited");
    }

    #[tokio::test]
    async fn test_connection_refused_is_actionable() {
        let url = format!("http://{}/chat/completions", free_local_addr());
        let transport = HttpTransport::new().unwrap();

        let err = transport
            .post_json(&url, &[], Vec::new())
            .await
            .expect_err("request should fail with connection-refused");

        assert!(
            matches!(
                err,
                TransportError::ConnectionRefused { .. } | TransportError::Connect { .. }
            ),
            "unexpected error: {err:?}"
        );
        let msg = err.to_string();
        assert!(msg.contains(&url), "unexpected message: {msg}");
        assert!(msg.contains("AI_ASK_BASE_URL"), "unexpected message: {msg}");
    }

    #[test]
    fn test_error_chain_detects_kind() {
        let err = std::io::Error::new(ErrorKind::TimedOut, "timed out");
        assert!(error_chain_has_kind(&err, ErrorKind::TimedOut));
        assert!(!error_chain_has_kind(&err, ErrorKind::ConnectionRefused));
    }
}
