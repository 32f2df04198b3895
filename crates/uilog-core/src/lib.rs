//! # uilog core
//!
//! The buffering and delivery engine behind `uilog`.
//!
//! A [`UiLogger`] posts every `log`, `error` and `flush` call as a message
//! to a background worker over a bounded FIFO channel. The worker owns the
//! log buffer, evicts the oldest `log` entries once `maxLogSize` is reached,
//! and ships the whole buffer to the collector when an error arrives or a
//! flush is requested. Delivery is fire-and-forget: the buffer is cleared
//! before the request goes out and failures are only logged.
//!
//! This crate is not meant to be used directly. Use `uilog` instead.

#![warn(missing_docs)]

pub mod buffer;
pub mod capture;
pub mod config;
pub mod context;
pub mod delivery;
pub mod envelope;
mod error;
pub mod host;
pub mod idle;
pub mod network;
pub mod protocol;
mod session;

pub use buffer::LogBuffer;
pub use capture::{ErrorEvent, GlobalEvents, ListenerId, RejectionEvent};
pub use config::{ResolvedConfig, SessionConfig, DEFAULT_IDLE_TIME_MS, DEFAULT_MAX_LOG_SIZE};
pub use context::{LifecycleState, LoggerContext, LoggerContextBuilder, DEFAULT_CHANNEL_CAPACITY};
pub use delivery::{DeliveryReceipt, HttpTransport, HttpTransportConfig, Transport};
pub use envelope::{default_header, DeliveryPayload, ErrorDetail, ErrorInput, EventEnvelope, EventKind};
pub use error::{DeliveryError, DeliveryResult, Error, Result};
pub use host::{HostEnvironment, SystemHost};
pub use idle::IdleTimer;
pub use network::{LastNetworkCall, NetworkCallCell, NetworkInterceptor, ResponseStatus, TrackedRequest};
pub use protocol::{Dispatcher, MessageKind, WorkerMessage};
pub use session::UiLogger;
