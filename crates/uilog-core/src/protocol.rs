//! Message protocol between the session controller and the buffer worker.
//!
//! Every message carries the full configuration snapshot, so the worker
//! keeps no configuration of its own: it only owns the log list.

use crate::config::ResolvedConfig;
use crate::envelope::EventEnvelope;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::{mpsc, oneshot};

/// Kind of a worker message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Buffer a log line.
    Log,
    /// Buffer an error and optionally deliver.
    Error,
    /// Deliver the buffer if debug delivery is enabled.
    Flush,
}

impl MessageKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Error => "error",
            Self::Flush => "flush",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message as posted to the worker.
///
/// Serializes to
/// `{ type, message, apiUrl, maxLogSize, isDev, header, sendDebugLogToApi, sendErrorLogToApi, sessionId }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerMessage {
    /// Message kind
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Finalized message text (empty for `flush`)
    pub message: String,
    /// Collector endpoint
    pub api_url: String,
    /// Buffer capacity for the `log` path
    pub max_log_size: usize,
    /// Development mode: write to the console instead of buffering
    pub is_dev: bool,
    /// Correlation header
    pub header: BTreeMap<String, String>,
    /// Whether `flush` delivers
    pub send_debug_log_to_api: bool,
    /// Whether `error` delivers immediately
    pub send_error_log_to_api: bool,
    /// Session identifier of the sender
    pub session_id: String,
}

/// Everything the worker can be asked to do.
#[derive(Debug)]
pub(crate) enum Command {
    /// A protocol message.
    Post(WorkerMessage),
    /// Report the current buffer contents.
    Inspect(oneshot::Sender<Vec<EventEnvelope>>),
    /// Stop processing after acknowledging.
    Shutdown(oneshot::Sender<()>),
}

/// Builds protocol messages from a configuration snapshot and posts them.
///
/// This is the only way foreground code reaches the worker. Posting never
/// waits: a full channel drops the message with a warning.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::Sender<Command>,
    config: ResolvedConfig,
    is_dev: bool,
    session_id: String,
}

impl Dispatcher {
    pub(crate) fn new(
        sender: mpsc::Sender<Command>,
        config: ResolvedConfig,
        is_dev: bool,
        session_id: String,
    ) -> Self {
        Self {
            sender,
            config,
            is_dev,
            session_id,
        }
    }

    /// Build the protocol message for `kind`.
    pub fn message(&self, kind: MessageKind, message: impl Into<String>) -> WorkerMessage {
        WorkerMessage {
            kind,
            message: message.into(),
            api_url: self.config.api_url.clone(),
            max_log_size: self.config.max_log_size,
            is_dev: self.is_dev,
            header: self.config.api_header.clone(),
            send_debug_log_to_api: self.config.send_debug_log_to_api,
            send_error_log_to_api: self.config.send_error_log_to_api,
            session_id: self.session_id.clone(),
        }
    }

    /// Post a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] if the worker has stopped.
    pub fn post(&self, kind: MessageKind, message: impl Into<String>) -> Result<()> {
        let msg = self.message(kind, message);
        match self.sender.try_send(Command::Post(msg)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    kind = %kind,
                    "log channel full, dropping message"
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::Disposed),
        }
    }

    pub(crate) async fn inspect(&self) -> Result<Vec<EventEnvelope>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Inspect(tx))
            .await
            .map_err(|_| Error::Disposed)?;
        rx.await.map_err(|_| Error::Disposed)
    }

    pub(crate) async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(Command::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Session identifier stamped on every message.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Development-mode flag stamped on every message.
    pub fn is_dev(&self) -> bool {
        self.is_dev
    }
}
