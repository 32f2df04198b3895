//! Network capture as a tower layer.
//!
//! Wrap any outbound HTTP service with [`NetworkCaptureLayer`] and every
//! request it sends becomes the "last network call" that errors are
//! correlated with. The wrapped service's response and error are returned
//! unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use uilog_extras::NetworkCaptureLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(NetworkCaptureLayer::new(logger.network_interceptor().clone()))
//!     .service(http_client);
//! ```

use crate::preview::BodyPreview;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uilog_core::NetworkInterceptor;

/// Layer that records outbound requests through a [`NetworkInterceptor`].
#[derive(Clone, Debug)]
pub struct NetworkCaptureLayer {
    interceptor: NetworkInterceptor,
}

impl NetworkCaptureLayer {
    /// Create a layer recording into `interceptor`.
    pub fn new(interceptor: NetworkInterceptor) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for NetworkCaptureLayer {
    type Service = NetworkCaptureService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        NetworkCaptureService {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

/// Service produced by [`NetworkCaptureLayer`].
#[derive(Clone, Debug)]
pub struct NetworkCaptureService<S> {
    inner: S,
    interceptor: NetworkInterceptor,
}

impl<S> NetworkCaptureService<S> {
    /// The wrapped service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, B, R> Service<http::Request<B>> for NetworkCaptureService<S>
where
    S: Service<http::Request<B>, Response = http::Response<R>>,
    S::Future: Send + 'static,
    B: BodyPreview,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let call_id = self.interceptor.record_start(
            req.uri().to_string(),
            req.method().as_str(),
            req.body().preview(),
        );
        let interceptor = self.interceptor.clone();
        let future = self.inner.call(req);

        Box::pin(async move {
            let result = future.await;
            if let Ok(response) = &result {
                interceptor.record_status(call_id, response.status().as_u16());
            }
            result
        })
    }
}
