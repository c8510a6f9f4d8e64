// HTTP Submitter - POSTs queued payloads to the remote API
use async_trait::async_trait;
use offline_queue_core::domain::ItemPayload;
use offline_queue_core::error::{AppError, Result};
use offline_queue_core::port::{SubmitError, Submitter};
use std::time::Duration;
use tracing::debug;

/// Response bodies are truncated to this many characters in error messages
const MAX_ERROR_BODY_CHARS: usize = 512;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Submits one action kind as `POST {base_url}/{path}` with a JSON body
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
}

impl HttpSubmitter {
    pub fn new(base_url: &str, path: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url, path))
    }

    /// Share one client (and its connection pool) between submitters
    pub fn with_client(client: reqwest::Client, base_url: &str, path: &str) -> Self {
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, payload: &ItemPayload) -> std::result::Result<(), SubmitError> {
        if payload.as_value().is_null() {
            return Err(SubmitError::InvalidPayload("payload is null".to_string()));
        }

        let response = self
            .client
            .post(&self.url)
            .json(payload.as_value())
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(url = %self.url, status = status.as_u16(), "Remote accepted submission");
            return Ok(());
        }

        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect();
        Err(SubmitError::Rejected(format!("HTTP {}: {}", status.as_u16(), body)))
    }
}
