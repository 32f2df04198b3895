use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use uilog_core::DeliveryPayload;

type GenericError = Box<dyn std::error::Error + Send + Sync>;
type Result<T> = std::result::Result<T, GenericError>;

/// Path the collector advertises through [`MockCollector::ingest_url`].
pub const INGEST_PATH: &str = "/ingest";

/// A mock log collector
///
/// Accepts any request, answers with the configured status and records what
/// it received.
pub struct MockCollector {
    addr: SocketAddr,
    state: Arc<Mutex<CollectorState>>,
    arrived: Arc<Notify>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

struct CollectorState {
    status: StatusCode,
    received: Vec<ReceivedBatch>,
}

/// A request as seen by the collector.
#[derive(Debug, Clone)]
pub struct ReceivedBatch {
    pub method: http::Method,
    pub path: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
    /// The body decoded as a delivery payload, if it is one
    pub payload: Option<DeliveryPayload>,
}

impl ReceivedBatch {
    /// Decoded `logs` field of the payload.
    ///
    /// Panics if the body was not a delivery payload.
    pub fn logs(&self) -> Vec<String> {
        let payload = self
            .payload
            .as_ref()
            .expect("request body is not a delivery payload");
        payload.decode_logs().expect("logs field is not a JSON string array")
    }

    /// The `Content-Type` header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl MockCollector {
    /// Start a new collector on a random port
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock collector");
        let addr = listener.local_addr().expect("mock collector has no address");

        let state = Arc::new(Mutex::new(CollectorState {
            status: StatusCode::OK,
            received: Vec::new(),
        }));
        let arrived = Arc::new(Notify::new());

        let state_clone = state.clone();
        let arrived_clone = arrived.clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut stop_future = shutdown_rx;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let state = state_clone.clone();
                                let arrived = arrived_clone.clone();

                                tokio::spawn(async move {
                                    let service = service_fn(move |req| {
                                        handle_request(req, state.clone(), arrived.clone())
                                    });
                                    if let Err(err) = hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new())
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        tracing::debug!(error = ?err, "mock collector connection closed");
                                    }
                                });
                            }
                            Err(e) => tracing::warn!(error = %e, "mock collector accept error"),
                        }
                    }
                    _ = &mut stop_future => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            state,
            arrived,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL of the collector
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL to configure as `apiUrl`
    pub fn ingest_url(&self) -> String {
        format!("{}{}", self.base_url(), INGEST_PATH)
    }

    /// Answer every following request with `status`
    pub fn respond_with(&self, status: u16) {
        self.lock().status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    }

    /// Everything received so far, in arrival order
    pub fn received(&self) -> Vec<ReceivedBatch> {
        self.lock().received.clone()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.lock().received.len()
    }

    /// Wait until at least `count` requests arrived, or until `timeout`
    /// passes, and return what arrived.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<ReceivedBatch> {
        let wait = async {
            loop {
                let notified = self.arrived.notified();
                if self.request_count() >= count {
                    break;
                }
                notified.await;
            }
        };
        let _ = tokio::time::timeout(timeout, wait).await;
        self.received()
    }

    /// Assert that nothing arrives within `window`.
    pub async fn assert_quiet(&self, window: Duration) {
        tokio::time::sleep(window).await;
        let received = self.received();
        assert!(
            received.is_empty(),
            "expected no deliveries, got {}: {:?}",
            received.len(),
            received.iter().map(|r| &r.body).collect::<Vec<_>>()
        );
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for MockCollector {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<Mutex<CollectorState>>,
    arrived: Arc<Notify>,
) -> Result<Response<Full<Bytes>>> {
    let (parts, body) = req.into_parts();
    let body_bytes = body.collect().await?.to_bytes();
    let payload = serde_json::from_slice::<DeliveryPayload>(&body_bytes).ok();

    let status = {
        let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
        state.received.push(ReceivedBatch {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            body: body_bytes,
            payload,
        });
        state.status
    };
    arrived.notify_waiters();

    Ok(Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))?)
}
