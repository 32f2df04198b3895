use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use uilog_core::{DeliveryError, DeliveryPayload, DeliveryReceipt, DeliveryResult, Transport};

/// A delivery captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub url: String,
    pub payload: DeliveryPayload,
}

impl Delivery {
    /// Decoded `logs` field.
    pub fn logs(&self) -> Vec<String> {
        self.payload
            .decode_logs()
            .expect("logs field is not a JSON string array")
    }
}

#[derive(Default)]
struct Recorded {
    deliveries: Vec<Delivery>,
    failure: Option<String>,
    status: Option<u16>,
}

/// In-memory transport that records every payload.
///
/// Clones share the recording.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<Recorded>>,
    arrived: Arc<Notify>,
}

impl RecordingTransport {
    /// Create an empty recorder answering `200`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record deliveries but report them as network failures.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.lock().failure = Some(message.into());
    }

    /// Answer with `status` instead of `200`.
    pub fn respond_with(&self, status: u16) {
        self.lock().status = Some(status);
    }

    /// Everything delivered so far.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().deliveries.clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.lock().deliveries.clear();
    }

    /// Number of deliveries so far.
    pub fn count(&self) -> usize {
        self.lock().deliveries.len()
    }

    /// Wait until at least `count` deliveries were made, or until `timeout`
    /// passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Delivery> {
        let wait = async {
            loop {
                let notified = self.arrived.notified();
                if self.count() >= count {
                    break;
                }
                notified.await;
            }
        };
        let _ = tokio::time::timeout(timeout, wait).await;
        self.deliveries()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, url: &str, payload: &DeliveryPayload) -> DeliveryResult<DeliveryReceipt> {
        let result = {
            let mut state = self.lock();
            state.deliveries.push(Delivery {
                url: url.to_string(),
                payload: payload.clone(),
            });
            match &state.failure {
                Some(message) => Err(DeliveryError::Http(message.clone())),
                None => Ok(DeliveryReceipt {
                    status: state.status.unwrap_or(200),
                }),
            }
        };
        self.arrived.notify_waiters();
        result
    }
}
