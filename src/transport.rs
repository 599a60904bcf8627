//! Network transport for entry replay.
//!
//! [`SyncTransport`] is the seam between the drain coordinator and the
//! wire: the coordinator hands it an entry, it reports either a transport
//! failure or a completed response. Application-level failure (a non-2xx
//! status) is the coordinator's call to make; both outcomes count the
//! same against an entry's retry budget.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::entry::{HttpMethod, SyncEntry};

#[derive(Error, Debug)]
pub enum TransportError {
    /// The request never completed: DNS, connection reset, TLS failure.
    #[error("request could not be completed: {0}")]
    Send(String),
    /// The environment's deadline elapsed. Treated identically to any other
    /// transport failure by the coordinator.
    #[error("request timed out")]
    Timeout,
}

/// A completed network exchange.
#[derive(Debug, Clone)]
pub struct SyncResponse {
    pub status: u16,
    pub body: String,
}

impl SyncResponse {
    /// Application-level "ok": the replay counts as synced.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Replay the operation described by the entry's endpoint, method and
    /// payload.
    async fn execute(&self, entry: &SyncEntry) -> Result<SyncResponse, TransportError>;
}

/// reqwest-backed transport.
///
/// Deadlines are the caller's concern: pass a pre-configured client via
/// [`HttpTransport::with_client`] to impose one.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn execute(&self, entry: &SyncEntry) -> Result<SyncResponse, TransportError> {
        let mut request = match entry.method {
            HttpMethod::Get => self.client.get(&entry.endpoint),
            HttpMethod::Post => self.client.post(&entry.endpoint),
            HttpMethod::Put => self.client.put(&entry.endpoint),
            HttpMethod::Delete => self.client.delete(&entry.endpoint),
        };

        if let Some(payload) = &entry.payload {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Send(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        debug!(
            endpoint = %entry.endpoint,
            method = %entry.method,
            status,
            "replay request completed"
        );

        Ok(SyncResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_ok_range() {
        assert!(SyncResponse { status: 200, body: String::new() }.is_ok());
        assert!(SyncResponse { status: 204, body: String::new() }.is_ok());
        assert!(!SyncResponse { status: 199, body: String::new() }.is_ok());
        assert!(!SyncResponse { status: 300, body: String::new() }.is_ok());
        assert!(!SyncResponse { status: 500, body: String::new() }.is_ok());
    }
}
