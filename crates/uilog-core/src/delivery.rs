//! Delivery channel.
//!
//! A [`Transport`] ships one [`DeliveryPayload`] to the collector. Delivery
//! is one-shot: the caller never retries and never re-queues, whatever the
//! outcome.

use crate::envelope::DeliveryPayload;
use crate::error::{DeliveryResult, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Default request timeout for [`HttpTransport`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a delivery that reached the collector.
///
/// Any HTTP status counts as delivered; only network-level failures are
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// HTTP status returned by the collector
    pub status: u16,
}

impl DeliveryReceipt {
    /// Whether the collector answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for shipping payloads to a collector.
///
/// Implement this trait to deliver somewhere other than HTTP.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver a single payload to `url`.
    async fn deliver(&self, url: &str, payload: &DeliveryPayload) -> DeliveryResult<DeliveryReceipt>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn deliver(&self, url: &str, payload: &DeliveryPayload) -> DeliveryResult<DeliveryReceipt> {
        (**self).deliver(url, payload).await
    }
}

/// HTTP transport configuration.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            headers: Vec::new(),
        }
    }
}

impl HttpTransportConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Transport that POSTs payloads as JSON.
///
/// # Example
///
/// ```ignore
/// use uilog_core::delivery::{HttpTransport, HttpTransportConfig};
/// use std::time::Duration;
///
/// let transport = HttpTransport::with_config(
///     HttpTransportConfig::new().timeout(Duration::from_secs(5)),
/// )?;
/// ```
#[derive(Clone, Debug)]
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create an HTTP transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create an HTTP transport with custom settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(crate::error::DeliveryError::from)?;

        Ok(Self { config, client })
    }

    /// Use an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            config: HttpTransportConfig::default(),
            client,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, url: &str, payload: &DeliveryPayload) -> DeliveryResult<DeliveryReceipt> {
        let body = serde_json::to_vec(payload)?;

        let mut request = self
            .client
            .post(url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body);

        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        Ok(DeliveryReceipt {
            status: response.status().as_u16(),
        })
    }
}
