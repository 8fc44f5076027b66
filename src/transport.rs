use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FailureReason;

/// Carries one serialized envelope to one listener.
///
/// Implementations report only success or a failure reason; response bodies
/// are never read.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, body: Bytes) -> Result<(), FailureReason>;
}

/// JSON-over-HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: Bytes) -> Result<(), FailureReason> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await;

        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    Ok(())
                } else if resp.status().is_client_error() {
                    Err(FailureReason::ClientError)
                } else {
                    Err(FailureReason::RemoteError)
                }
            }
            Err(err) => {
                if err.is_timeout() {
                    Err(FailureReason::Timeout)
                } else {
                    Err(FailureReason::Network)
                }
            }
        }
    }
}
