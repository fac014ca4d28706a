//! HTTP transport seam
//!
//! A [`Transport`] performs exactly one GET exchange and reports either the
//! status code and body or a classified [`FetchError`]. The production
//! implementation is [`HttpTransport`]; tests substitute their own.

use crate::config::Config;
use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;

/// Response of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body (only read for 200 responses)
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Build a response from a status and body
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// One request/response exchange over HTTP
///
/// Implementations must resolve within `timeout`; an exchange that runs longer
/// resolves to [`FetchError::Timeout`] rather than hanging.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET for `url`
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, FetchError>;
}

/// reqwest-backed transport sharing one connection pool across a run
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the HTTP client from the run configuration
    ///
    /// Redirects are not followed and cookies are not stored.
    pub fn new(config: &Config) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.max_concurrent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn exchange(&self, url: &str) -> Result<TransportResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Ok(TransportResponse::new(status, Vec::new()));
        }
        let body = response.bytes().await?;
        Ok(TransportResponse::new(status, body.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, FetchError> {
        match tokio::time::timeout(timeout, self.exchange(url)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(classify_reqwest_error(&e)),
            Err(_) => Err(FetchError::Timeout),
        }
    }
}

/// Map a reqwest error onto the fetch error taxonomy
pub(crate) fn classify_reqwest_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect()
        || e.is_request()
        || e.is_body()
        || e.is_decode()
        || e.is_redirect()
        || e.is_builder()
    {
        FetchError::Connection(e.to_string())
    } else {
        FetchError::Unexpected(e.to_string())
    }
}
