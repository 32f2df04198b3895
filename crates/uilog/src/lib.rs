//! # uilog
//!
//! Client telemetry for Rust applications.
//!
//! `uilog` collects log lines and errors from an application, buffers them
//! on a background task and ships them to a collector endpoint in batches.
//! Errors can carry the most recent outbound network call so a failure can
//! be traced back to the request that caused it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use uilog::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> uilog::Result<()> {
//!     let logger = uilog::init(
//!         SessionConfig::new()
//!             .api_url("https://logs.example.com/ingest")
//!             .max_log_size(50)
//!             .send_debug_log_to_api(true)
//!             .send_error_log_to_api(true)
//!             .auto_capture_events(true),
//!     )?;
//!
//!     logger.log("checkout started")?;
//!     logger.error("payment declined")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery rules
//!
//! - `log` buffers; once `maxLogSize` entries are buffered the oldest is
//!   dropped.
//! - `error` always buffers and, with `sendErrorLogToApi`, ships the whole
//!   buffer at once.
//! - `flush`, and the idle timer after `idleTime` without a `log`, ship the
//!   buffer when `sendDebugLogToApi` is on.
//! - On a `localhost` host everything goes to the `uilog::console` tracing
//!   target instead.
//!
//! ## Optional Features
//!
//! - `layer` - tower layer recording outbound calls (default)
//! - `client` - instrumented `reqwest` client (default)
//! - `config` - configuration from `UILOG_*` environment variables
//! - `full` - All optional features enabled

use std::sync::OnceLock;

// Re-export core functionality
pub use uilog_core::*;

// Re-export extras (feature-gated)
#[cfg(any(feature = "layer", feature = "client", feature = "config"))]
pub use uilog_extras::{preview, BodyPreview};

#[cfg(feature = "layer")]
pub use uilog_extras::layer;
#[cfg(feature = "layer")]
pub use uilog_extras::{NetworkCaptureLayer, NetworkCaptureService};

#[cfg(feature = "client")]
pub use uilog_extras::client;
#[cfg(feature = "client")]
pub use uilog_extras::InstrumentedClient;

#[cfg(feature = "config")]
pub use uilog_extras::config;
#[cfg(feature = "config")]
pub use uilog_extras::{load_dotenv, load_dotenv_from, session_config_from_env, ConfigError};

static CONTEXT: OnceLock<LoggerContext> = OnceLock::new();

/// Use `context` as the process-wide context.
///
/// Must happen before the first [`init`]. Returns the context back if one is
/// already in place.
pub fn install_context(context: LoggerContext) -> std::result::Result<(), LoggerContext> {
    CONTEXT.set(context)
}

/// The process-wide context, created with defaults on first use.
///
/// # Errors
///
/// Returns an error if the default HTTP transport cannot be created.
pub fn context() -> Result<&'static LoggerContext> {
    if let Some(context) = CONTEXT.get() {
        return Ok(context);
    }
    let context = LoggerContext::new()?;
    Ok(CONTEXT.get_or_init(|| context))
}

/// Create the process-wide logger, or return the existing one.
///
/// Only the first configuration takes effect.
///
/// # Errors
///
/// Returns an error if called outside a Tokio runtime or if the default
/// context cannot be created.
pub fn init(config: SessionConfig) -> Result<UiLogger> {
    context()?.init(config)
}

/// The process-wide logger, if [`init`] has been called.
pub fn global() -> Option<UiLogger> {
    CONTEXT.get().and_then(LoggerContext::get)
}

/// Dispose the process-wide logger and clear all captured state.
pub async fn reset() {
    if let Some(context) = CONTEXT.get() {
        context.reset().await;
    }
}

/// Prelude module - import everything you need with `use uilog::prelude::*`
pub mod prelude {
    pub use uilog_core::{
        ErrorInput,
        HostEnvironment,
        LifecycleState,
        LoggerContext,
        NetworkInterceptor,
        Result,
        SessionConfig,
        Transport,
        UiLogger,
    };

    #[cfg(feature = "layer")]
    pub use uilog_extras::NetworkCaptureLayer;

    #[cfg(feature = "client")]
    pub use uilog_extras::InstrumentedClient;

    #[cfg(feature = "config")]
    pub use uilog_extras::{load_dotenv, session_config_from_env};

    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, trace, warn};
}
