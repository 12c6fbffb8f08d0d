//! Chat-completion client.
//!
//! Sends one non-streaming request per call and hands back the first
//! choice's content untouched.

pub mod transport;

use crate::protocol::{ChatRequest, ChatResponse};
use reqwest::StatusCode;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use transport::{Transport, TransportError};

/// Errors from a chat round trip.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    /// The server answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Outcome of a successful round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Content of the first choice.
    Content(String),
    /// The server returned no choices at all.
    Empty,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient<T> {
    transport: T,
    base_url: String,
    api_key: String,
    model: String,
}

impl<T: Transport> ChatClient<T> {
    /// Create a new client.
    pub fn new(
        transport: T,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Ask `question` under `system_prompt`.
    pub async fn send(&self, system_prompt: &str, question: &str) -> Result<Reply, ChatError> {
        let request = ChatRequest::new(self.model.as_str(), system_prompt, question);
        let body = serde_json::to_vec(&request).map_err(ChatError::Encode)?;
        let url = self.endpoint();
        let headers = [
            ("Content-Type", "application/json".to_string()),
            ("Authorization", format!("Bearer {}", self.api_key)),
        ];

        debug!(%url, model = %self.model, bytes = body.len(), "sending chat request");
        let started = Instant::now();
        let response = self.transport.post_json(&url, &headers, body).await?;
        debug!(
            status = %response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat response received"
        );

        if !response.status.is_success() {
            return Err(ChatError::Api {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&response.body).map_err(ChatError::Decode)?;

        Ok(match parsed.into_first_content() {
            Some(content) => Reply::Content(content),
            None => Reply::Empty,
        })
    }
}
