//! Error types for uilog

use thiserror::Error;

/// Result type alias for uilog operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced to callers of the public logger API.
///
/// Background failures (delivery, a full channel) are never returned here.
/// They are written to the diagnostic log and dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// The logger was disposed and no longer accepts messages.
    #[error("logger has been disposed")]
    Disposed,

    /// The logger was constructed outside of a tokio runtime.
    #[error("no tokio runtime available to host the log worker")]
    NoRuntime,

    /// A value could not be serialized into its wire representation.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The delivery channel could not be created or used.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Error type for delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Network-level failure talking to the collector.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport is closed or unavailable.
    #[error("Delivery channel unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Http(err.to_string())
    }
}

/// Result type for delivery operations.
pub type DeliveryResult<T> = std::result::Result<T, DeliveryError>;
