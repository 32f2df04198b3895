//! Data structures for buffered events and outbound payloads.

use crate::network::LastNetworkCall;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Action tag used by the generated default header.
pub const DEFAULT_ACTION: &str = "auditClientLogs";

/// Kind of a buffered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Debug/info log line.
    Log,
    /// Serialized error detail.
    Error,
}

/// A single buffered entry.
///
/// The message is final once the envelope is built; the buffer never
/// rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Entry kind
    pub kind: EventKind,
    /// Serialized message payload
    pub message: String,
    /// Capture time (epoch milliseconds)
    pub timestamp: i64,
}

impl EventEnvelope {
    /// Create a `log` envelope.
    pub fn log(message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: EventKind::Log,
            message: message.into(),
            timestamp,
        }
    }

    /// Create an `error` envelope.
    pub fn error(message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: EventKind::Error,
            message: message.into(),
            timestamp,
        }
    }
}

/// The body POSTed to the collector.
///
/// `logs` is itself a JSON-encoded array of message strings, so the body
/// is a JSON object carrying a string field that holds JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    /// Correlation metadata
    pub header: BTreeMap<String, String>,
    /// JSON-encoded array of buffered messages, oldest first
    pub logs: String,
    /// Send time (epoch milliseconds)
    pub timestamp: i64,
}

impl DeliveryPayload {
    /// Build a payload from buffered entries.
    ///
    /// An empty `header` is replaced by [`default_header`].
    pub fn new<'a>(
        header: &BTreeMap<String, String>,
        entries: impl IntoIterator<Item = &'a EventEnvelope>,
        now: i64,
    ) -> Result<Self, serde_json::Error> {
        let messages: Vec<&str> = entries.into_iter().map(|e| e.message.as_str()).collect();
        let header = if header.is_empty() {
            default_header(now)
        } else {
            header.clone()
        };

        Ok(Self {
            header,
            logs: serde_json::to_string(&messages)?,
            timestamp: now,
        })
    }

    /// Decode the `logs` field back into the message sequence.
    pub fn decode_logs(&self) -> Result<Vec<String>, serde_json::Error> {
        serde_json::from_str(&self.logs)
    }
}

/// The header used when the caller did not configure one.
pub fn default_header(now: i64) -> BTreeMap<String, String> {
    let mut header = BTreeMap::new();
    header.insert("action".to_string(), DEFAULT_ACTION.to_string());
    header.insert("corrId".to_string(), format!("{}-{}", DEFAULT_ACTION, now));
    header
}

/// Anything the `error` operation accepts: plain text or a structured error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInput {
    /// Error text
    pub message: String,
    /// Stack trace or cause chain, when known
    pub stack: Option<String>,
}

impl ErrorInput {
    /// Create an error input from text.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    /// Attach a stack trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture a `std::error::Error`, rendering its source chain as the stack.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            message: err.to_string(),
            stack: if chain.is_empty() {
                None
            } else {
                Some(chain.join("\n"))
            },
        }
    }
}

impl From<&str> for ErrorInput {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ErrorInput {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&String> for ErrorInput {
    fn from(message: &String) -> Self {
        Self::new(message.clone())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ErrorInput {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::from_error(err.as_ref())
    }
}

/// The structure serialized into the message of an `error` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// Error text
    pub error: String,
    /// Stack trace, when available
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stack: Option<String>,
    /// Most recent outbound call observed before the error
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_api_call: Option<LastNetworkCall>,
    /// Capture time (epoch milliseconds)
    pub timestamp: i64,
}

impl ErrorDetail {
    /// Build an error detail from caller input and the current network snapshot.
    pub fn new(input: ErrorInput, last_api_call: Option<LastNetworkCall>, timestamp: i64) -> Self {
        Self {
            error: input.message,
            stack: input.stack,
            last_api_call,
            timestamp,
        }
    }

    /// Serialize to the finalized message string.
    pub fn to_message(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
