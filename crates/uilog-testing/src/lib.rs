//! Testing utilities for uilog
//!
//! - [`MockCollector`]: a real HTTP server on a random port that accepts
//!   delivery payloads and records them for assertions.
//! - [`RecordingTransport`]: an in-memory [`Transport`](uilog_core::Transport)
//!   for tests that do not need a socket.
//! - [`FixedHost`]: a host environment with a controllable clock and
//!   predictable session ids.

pub mod collector;
pub mod host;
pub mod transport;

pub use collector::{MockCollector, ReceivedBatch, INGEST_PATH};
pub use host::FixedHost;
pub use transport::{Delivery, RecordingTransport};
