//! Host environment hooks.
//!
//! The logger needs three things from its surroundings: the host address
//! (for development-mode detection), the current time and a source of
//! unique identifiers. They sit behind [`HostEnvironment`] so tests can
//! pin them down.

/// Host address marker that switches the logger into development mode.
pub const DEV_HOST_MARKER: &str = "localhost";

/// Environment variable consulted first for the host address.
pub const HOST_ENV_VAR: &str = "UILOG_HOST";

/// Accessors the logger consumes from its host.
pub trait HostEnvironment: Send + Sync + 'static {
    /// Address the application is served from, if known.
    fn hostname(&self) -> Option<String>;

    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64;

    /// A fresh, process-unique identifier.
    fn random_id(&self) -> String;

    /// Whether the logger should run in development mode.
    fn is_dev(&self) -> bool {
        self.hostname()
            .map(|host| host.contains(DEV_HOST_MARKER))
            .unwrap_or(false)
    }
}

/// The real host: system clock, v4 UUIDs and an address from `UILOG_HOST`.
///
/// The machine hostname is never consulted, so a server named
/// `localhost.localdomain` does not drop into development mode.
#[derive(Debug, Clone, Default)]
pub struct SystemHost {
    hostname: Option<String>,
}

impl SystemHost {
    /// Read the host address from `UILOG_HOST`.
    pub fn new() -> Self {
        Self {
            hostname: std::env::var(HOST_ENV_VAR).ok(),
        }
    }

    /// Use an explicit host address.
    pub fn with_hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
        }
    }
}

impl HostEnvironment for SystemHost {
    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }

    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn random_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
