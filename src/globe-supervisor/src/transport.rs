//! Loopback channel to the active worker.
//!
//! The worker listens on localhost; requests can still fail or time
//! out (worker restarting, not yet listening, silently dead), so every
//! caller must tolerate stale remote state until the next successful
//! propagation.

use async_trait::async_trait;
use globe_protocol::{Color, ColorParseError};
use thiserror::Error;

/// Failure talking to the worker.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("worker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("worker returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("worker returned a malformed color: {0}")]
    Color(#[from] ColorParseError),
}

/// Color channel to the worker process.
#[async_trait]
pub trait WorkerTransport: Send + Sync {
    async fn set_color(&self, color: Color) -> Result<(), TransportError>;
    async fn get_color(&self) -> Result<Color, TransportError>;
}

/// HTTP transport against the worker's `/color` endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }

    fn url(&self) -> String {
        format!("{}/color", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl WorkerTransport for HttpTransport {
    async fn set_color(&self, color: Color) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url())
            .form(&[("color", color.to_hex())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }
        Ok(())
    }

    async fn get_color(&self) -> Result<Color, TransportError> {
        let response = self.client.get(self.url()).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }
        Ok(response.text().await?.parse()?)
    }
}
