//! Instrumented `reqwest` client.
//!
//! [`InstrumentedClient`] wraps a `reqwest::Client` so that every request it
//! executes is recorded as the last network call. Responses and errors are
//! returned untouched.
//!
//! ```rust,ignore
//! use uilog_extras::InstrumentedClient;
//!
//! let client = InstrumentedClient::new(reqwest::Client::new(), logger.network_interceptor().clone());
//! let response = client.send(client.post(url).json(&order)).await?;
//! ```

use crate::preview::preview_bytes;
use uilog_core::NetworkInterceptor;

/// A `reqwest::Client` that reports each request to a [`NetworkInterceptor`].
#[derive(Clone, Debug)]
pub struct InstrumentedClient {
    client: reqwest::Client,
    interceptor: NetworkInterceptor,
}

impl InstrumentedClient {
    /// Wrap an existing client.
    pub fn new(client: reqwest::Client, interceptor: NetworkInterceptor) -> Self {
        Self {
            client,
            interceptor,
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// The interceptor requests are reported to.
    pub fn interceptor(&self) -> &NetworkInterceptor {
        &self.interceptor
    }

    /// Start building a GET request.
    pub fn get(&self, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.client.get(url)
    }

    /// Start building a POST request.
    pub fn post(&self, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.client.post(url)
    }

    /// Start building a request with any method.
    pub fn request(&self, method: reqwest::Method, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Execute a request, recording it first.
    ///
    /// # Errors
    ///
    /// Returns whatever `reqwest` returns; the error is not altered.
    pub async fn execute(&self, request: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let url = request.url().to_string();
        let method = request.method().to_string();
        let payload = request
            .body()
            .and_then(|body| body.as_bytes())
            .and_then(preview_bytes);
        tracing::trace!(%url, %method, "instrumented request");

        self.interceptor
            .fetch(url, method, payload, self.client.execute(request))
            .await
    }

    /// Build and execute a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is invalid or the request fails.
    pub async fn send(&self, builder: reqwest::RequestBuilder) -> reqwest::Result<reqwest::Response> {
        let request = builder.build()?;
        self.execute(request).await
    }
}
