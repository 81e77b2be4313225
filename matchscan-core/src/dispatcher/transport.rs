use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Raw HTTP response handed back to the dispatcher for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure below the HTTP layer: DNS, connect, TLS, timeouts, truncated
/// bodies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Seam between the dispatcher and the HTTP client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, uri: &Url) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("matchscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TransportError(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, uri: &Url) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(uri.clone())
            .send()
            .await
            .map_err(|err| TransportError(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError(err.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }
}
