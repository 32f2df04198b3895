//! Session configuration.
//!
//! [`SessionConfig`] is what callers hand to the construction entry point.
//! Every field is optional; [`SessionConfig::resolve`] fills in defaults and
//! produces the immutable [`ResolvedConfig`] snapshot the logger runs with.
//!
//! ```ignore
//! use uilog_core::SessionConfig;
//!
//! let config = SessionConfig::new()
//!     .api_url("https://logs.example.com/ingest")
//!     .max_log_size(50)
//!     .idle_time_ms(30_000)
//!     .send_debug_log_to_api(true)
//!     .send_error_log_to_api(true);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default number of buffered log entries before the oldest is evicted.
pub const DEFAULT_MAX_LOG_SIZE: usize = 20;

/// Default inactivity period before an automatic flush, in milliseconds.
pub const DEFAULT_IDLE_TIME_MS: u64 = 30_000;

/// Caller-supplied logger configuration.
///
/// Field names follow the camelCase wire shape so a JSON config document
/// deserializes directly:
///
/// ```json
/// { "apiUrl": "https://logs.example.com", "maxLogSize": 50, "sendErrorLogToApi": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub(crate) api_url: Option<String>,
    pub(crate) api_header: Option<BTreeMap<String, String>>,
    pub(crate) max_log_size: Option<usize>,
    pub(crate) idle_time: Option<u64>,
    pub(crate) send_debug_log_to_api: Option<bool>,
    pub(crate) send_error_log_to_api: Option<bool>,
    pub(crate) auto_capture_events: Option<bool>,
    #[serde(rename = "autoCaptureAPI")]
    pub(crate) auto_capture_api: Option<bool>,
    pub(crate) enable_timestamps: Option<bool>,
}

impl SessionConfig {
    /// Create an empty configuration. All fields resolve to their defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collector endpoint that delivery payloads are POSTed to.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Replace the correlation header sent with every payload.
    ///
    /// An empty header means the generated default is used.
    pub fn api_header(
        mut self,
        header: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.api_header = Some(
            header
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Add a single correlation header entry.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.api_header
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the buffer capacity. Zero means "use the default".
    pub fn max_log_size(mut self, size: usize) -> Self {
        self.max_log_size = Some(size);
        self
    }

    /// Set the idle flush timeout in milliseconds. Zero means "use the default".
    pub fn idle_time_ms(mut self, millis: u64) -> Self {
        self.idle_time = Some(millis);
        self
    }

    /// Set the idle flush timeout.
    pub fn idle_time(self, timeout: Duration) -> Self {
        self.idle_time_ms(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deliver buffered logs on `flush` (manual or idle).
    pub fn send_debug_log_to_api(mut self, enabled: bool) -> Self {
        self.send_debug_log_to_api = Some(enabled);
        self
    }

    /// Deliver the buffer immediately whenever an error is reported.
    pub fn send_error_log_to_api(mut self, enabled: bool) -> Self {
        self.send_error_log_to_api = Some(enabled);
        self
    }

    /// Install the global error and unhandled-rejection listeners.
    pub fn auto_capture_events(mut self, enabled: bool) -> Self {
        self.auto_capture_events = Some(enabled);
        self
    }

    /// Install the network interceptor so errors carry the last outbound call.
    pub fn auto_capture_api(mut self, enabled: bool) -> Self {
        self.auto_capture_api = Some(enabled);
        self
    }

    /// Prefix each `log` message with its RFC 3339 capture time.
    pub fn enable_timestamps(mut self, enabled: bool) -> Self {
        self.enable_timestamps = Some(enabled);
        self
    }

    /// Apply defaults and freeze the configuration.
    ///
    /// Zero values for `maxLogSize` and `idleTime` are treated the same as
    /// unset ones.
    pub fn resolve(&self) -> ResolvedConfig {
        ResolvedConfig {
            api_url: self.api_url.clone().unwrap_or_default(),
            api_header: self.api_header.clone().unwrap_or_default(),
            max_log_size: self
                .max_log_size
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_MAX_LOG_SIZE),
            idle_time: Duration::from_millis(
                self.idle_time
                    .filter(|millis| *millis > 0)
                    .unwrap_or(DEFAULT_IDLE_TIME_MS),
            ),
            send_debug_log_to_api: self.send_debug_log_to_api.unwrap_or(false),
            send_error_log_to_api: self.send_error_log_to_api.unwrap_or(false),
            auto_capture_events: self.auto_capture_events.unwrap_or(false),
            auto_capture_api: self.auto_capture_api.unwrap_or(false),
            enable_timestamps: self.enable_timestamps.unwrap_or(false),
        }
    }
}

/// A fully defaulted, immutable configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Collector endpoint.
    pub api_url: String,
    /// Correlation header; empty means generate the default per payload.
    pub api_header: BTreeMap<String, String>,
    /// Buffer capacity enforced on the `log` path.
    pub max_log_size: usize,
    /// Inactivity period before an automatic flush.
    pub idle_time: Duration,
    /// Whether `flush` delivers.
    pub send_debug_log_to_api: bool,
    /// Whether `error` delivers immediately.
    pub send_error_log_to_api: bool,
    /// Whether global listeners are installed.
    pub auto_capture_events: bool,
    /// Whether the network interceptor is installed.
    pub auto_capture_api: bool,
    /// Whether `log` messages get a timestamp prefix.
    pub enable_timestamps: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        SessionConfig::default().resolve()
    }
}
