//! Background log buffer.
//!
//! [`LogBuffer`] is the bounded, FIFO-evicting list of pending entries.
//! [`BufferWorker`] owns one and drives it from the message channel; it is
//! the only code that ever mutates or clears the buffer.
//!
//! Delivery takes the whole buffer, clears it, and only then hands the
//! payload to the transport on a separate task. A `log` arriving while a
//! delivery is in flight lands in the next batch.

use crate::delivery::Transport;
use crate::envelope::{DeliveryPayload, EventEnvelope};
use crate::host::HostEnvironment;
use crate::protocol::{Command, MessageKind, WorkerMessage};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Target used for development-mode console output.
pub const CONSOLE_TARGET: &str = "uilog::console";

/// Ordered, bounded sequence of pending entries.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: VecDeque<EventEnvelope>,
}

impl LogBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a log entry, evicting the oldest entry first if the buffer is
    /// at or above `max_log_size`.
    ///
    /// At most one entry is evicted per call.
    pub fn push_log(&mut self, entry: EventEnvelope, max_log_size: usize) {
        if self.entries.len() >= max_log_size {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Append an error entry. Errors are never evicted on the way in.
    pub fn push_error(&mut self, entry: EventEnvelope) {
        self.entries.push_back(entry);
    }

    /// Build a payload from every buffered entry and clear the buffer.
    ///
    /// Returns `None` without touching anything when the buffer is empty.
    pub fn take_payload(
        &mut self,
        header: &BTreeMap<String, String>,
        now: i64,
    ) -> Option<Result<DeliveryPayload, serde_json::Error>> {
        if self.entries.is_empty() {
            return None;
        }
        let payload = DeliveryPayload::new(header, self.entries.iter(), now);
        self.entries.clear();
        Some(payload)
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffered messages, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    /// Copy of the buffered entries, oldest first.
    pub fn entries(&self) -> Vec<EventEnvelope> {
        self.entries.iter().cloned().collect()
    }
}

/// The background task that owns the [`LogBuffer`].
pub(crate) struct BufferWorker {
    buffer: LogBuffer,
    receiver: mpsc::Receiver<Command>,
    transport: Arc<dyn Transport>,
    host: Arc<dyn HostEnvironment>,
}

impl BufferWorker {
    pub(crate) fn new(
        receiver: mpsc::Receiver<Command>,
        transport: Arc<dyn Transport>,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self {
            buffer: LogBuffer::new(),
            receiver,
            transport,
            host,
        }
    }

    /// Process commands in arrival order until shutdown or until every
    /// sender is gone.
    pub(crate) async fn run(mut self) {
        while let Some(command) = self.receiver.recv().await {
            match command {
                Command::Post(message) => self.handle(message),
                Command::Inspect(reply) => {
                    let _ = reply.send(self.buffer.entries());
                }
                Command::Shutdown(ack) => {
                    tracing::debug!(pending = self.buffer.len(), "log worker shutting down");
                    let _ = ack.send(());
                    break;
                }
            }
        }
    }

    fn handle(&mut self, message: WorkerMessage) {
        if message.is_dev {
            tracing::info!(
                target: CONSOLE_TARGET,
                session_id = %message.session_id,
                kind = %message.kind,
                "{}",
                message.message
            );
            return;
        }

        let now = self.host.now_millis();
        match message.kind {
            MessageKind::Log => {
                self.buffer
                    .push_log(EventEnvelope::log(message.message, now), message.max_log_size);
            }
            MessageKind::Error => {
                let deliver = message.send_error_log_to_api;
                self.buffer
                    .push_error(EventEnvelope::error(message.message.clone(), now));
                if deliver {
                    self.deliver(&message, now);
                }
            }
            MessageKind::Flush => {
                if message.send_debug_log_to_api {
                    self.deliver(&message, now);
                }
            }
        }
    }

    fn deliver(&mut self, message: &WorkerMessage, now: i64) {
        let payload = match self.buffer.take_payload(&message.header, now) {
            None => return,
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                tracing::error!(error = %e, "failed to encode log batch, dropping it");
                return;
            }
        };

        let transport = self.transport.clone();
        let url = message.api_url.clone();
        let session_id = message.session_id.clone();

        tokio::spawn(async move {
            match transport.deliver(&url, &payload).await {
                Ok(receipt) if receipt.is_success() => {
                    tracing::debug!(session_id = %session_id, status = receipt.status, "log batch delivered");
                }
                Ok(receipt) => {
                    tracing::debug!(
                        session_id = %session_id,
                        status = receipt.status,
                        "collector answered with a non-success status"
                    );
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, url = %url, error = %e, "failed to deliver log batch");
                }
            }
        });
    }
}
