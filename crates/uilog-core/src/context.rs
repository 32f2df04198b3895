//! Logger context: the owner of everything that would otherwise be global.
//!
//! A [`LoggerContext`] holds the host hooks, the transport, the shared
//! last-network-call cell, the interceptor installation flag, the global
//! event registry and the single [`UiLogger`] slot. Build one at application
//! start and hand it to whoever needs to log.
//!
//! ```ignore
//! use uilog_core::{LoggerContext, SessionConfig};
//!
//! let context = LoggerContext::builder().build()?;
//! let logger = context.init(
//!     SessionConfig::new()
//!         .api_url("https://logs.example.com/ingest")
//!         .send_error_log_to_api(true),
//! )?;
//! logger.log("page loaded")?;
//! ```

use crate::capture::{GlobalEvents, ListenerId};
use crate::config::SessionConfig;
use crate::delivery::{HttpTransport, Transport};
use crate::error::Result;
use crate::host::{HostEnvironment, SystemHost};
use crate::idle::DEFAULT_DEBOUNCE;
use crate::network::{NetworkCallCell, NetworkInterceptor};
use crate::session::{SessionParts, UiLogger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default capacity of the channel feeding the buffer worker.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Lifecycle of a context's logger slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No logger has been created yet, or the last one was reset.
    Uninitialized,
    /// A logger exists and accepts calls.
    Active,
}

/// Builder for [`LoggerContext`].
pub struct LoggerContextBuilder {
    host: Option<Arc<dyn HostEnvironment>>,
    transport: Option<Arc<dyn Transport>>,
    channel_capacity: usize,
    debounce: Duration,
}

impl Default for LoggerContextBuilder {
    fn default() -> Self {
        Self {
            host: None,
            transport: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl LoggerContextBuilder {
    /// Use a custom host environment.
    pub fn host(self, host: impl HostEnvironment) -> Self {
        self.shared_host(Arc::new(host))
    }

    /// Use a host environment shared with other code.
    pub fn shared_host(mut self, host: Arc<dyn HostEnvironment>) -> Self {
        self.host = Some(host);
        self
    }

    /// Use a custom transport instead of HTTP.
    pub fn transport(self, transport: impl Transport) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    /// Use a transport shared with other code.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Capacity of the worker channel.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Debounce window of the idle timer.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Build the context.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport was given and the default HTTP
    /// transport cannot be created.
    pub fn build(self) -> Result<LoggerContext> {
        let host = self
            .host
            .unwrap_or_else(|| Arc::new(SystemHost::new()) as Arc<dyn HostEnvironment>);
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        let cell = NetworkCallCell::new();
        let installed = Arc::new(AtomicBool::new(false));
        let network = NetworkInterceptor::new(cell.clone(), installed.clone(), host.clone());

        Ok(LoggerContext {
            host,
            transport,
            cell,
            installed,
            network,
            events: GlobalEvents::new(),
            channel_capacity: self.channel_capacity,
            debounce: self.debounce,
            logger: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        })
    }
}

/// Owner of the logger singleton and its shared state.
pub struct LoggerContext {
    host: Arc<dyn HostEnvironment>,
    transport: Arc<dyn Transport>,
    cell: NetworkCallCell,
    installed: Arc<AtomicBool>,
    network: NetworkInterceptor,
    events: GlobalEvents,
    channel_capacity: usize,
    debounce: Duration,
    logger: Mutex<Option<UiLogger>>,
    listeners: Mutex<Vec<ListenerId>>,
}

impl LoggerContext {
    /// Start building a context.
    pub fn builder() -> LoggerContextBuilder {
        LoggerContextBuilder::default()
    }

    /// Build a context with the system host and the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be created.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Return the logger, creating it on first use.
    ///
    /// Only the first configuration is applied. Later calls return the same
    /// logger and ignore their argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuntime`](crate::Error::NoRuntime) if the logger has
    /// to be created outside a Tokio runtime.
    pub fn init(&self, config: SessionConfig) -> Result<UiLogger> {
        let mut slot = self.logger.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = slot.as_ref().filter(|l| !l.is_disposed()) {
            tracing::debug!(
                session_id = %existing.session_id(),
                "logger already initialized, ignoring new configuration"
            );
            return Ok(existing.clone());
        }
        // A disposed predecessor must not keep intercepting global events.
        self.remove_listeners();

        let resolved = config.resolve();
        let logger = UiLogger::spawn(
            resolved.clone(),
            SessionParts {
                host: self.host.clone(),
                transport: self.transport.clone(),
                network: self.network.clone(),
                channel_capacity: self.channel_capacity,
                debounce: self.debounce,
            },
        )?;

        if resolved.auto_capture_api {
            self.network.install();
        }
        if resolved.auto_capture_events {
            self.install_listeners(&logger);
        }

        *slot = Some(logger.clone());
        Ok(logger)
    }

    /// The current logger, if one is active.
    pub fn get(&self) -> Option<UiLogger> {
        self.logger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|l| !l.is_disposed())
            .cloned()
    }

    /// Lifecycle state of the logger slot.
    pub fn state(&self) -> LifecycleState {
        if self.get().is_some() {
            LifecycleState::Active
        } else {
            LifecycleState::Uninitialized
        }
    }

    /// Tear everything down so the next [`init`](Self::init) starts fresh.
    ///
    /// Disposes the logger, removes the global listeners, empties the
    /// last-network-call slot and uninstalls the interceptor.
    pub async fn reset(&self) {
        let logger = self
            .logger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(logger) = logger {
            logger.dispose().await;
        }

        self.remove_listeners();
        self.events.clear();
        self.cell.clear();
        self.installed.store(false, Ordering::SeqCst);
        tracing::debug!("logger context reset");
    }

    /// Global error and rejection registry.
    pub fn events(&self) -> &GlobalEvents {
        &self.events
    }

    /// Interceptor for outbound network calls.
    pub fn network(&self) -> &NetworkInterceptor {
        &self.network
    }

    /// Host hooks this context runs with.
    pub fn host(&self) -> &Arc<dyn HostEnvironment> {
        &self.host
    }

    fn remove_listeners(&self) {
        let ids = std::mem::take(&mut *self.listeners.lock().unwrap_or_else(|e| e.into_inner()));
        for id in ids {
            self.events.remove_listener(id);
        }
    }

    fn install_listeners(&self, logger: &UiLogger) {
        let weak = logger.downgrade();
        let on_error = self.events.add_error_listener(move |event| {
            let Some(logger) = weak.upgrade().map(UiLogger::from_inner) else {
                return;
            };
            if logger.is_disposed() {
                return;
            }
            event.stop_propagation();
            if let Err(e) = logger.error(event.to_string()) {
                tracing::warn!(error = %e, "failed to record global error");
            }
        });

        let weak = logger.downgrade();
        let on_rejection = self.events.add_rejection_listener(move |event| {
            let Some(logger) = weak.upgrade().map(UiLogger::from_inner) else {
                return;
            };
            if logger.is_disposed() {
                return;
            }
            event.stop_propagation();
            if let Err(e) = logger.error(event.to_string()) {
                tracing::warn!(error = %e, "failed to record unhandled rejection");
            }
        });

        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend([on_error, on_rejection]);

        self.events.install_panic_hook();
        tracing::debug!(session_id = %logger.session_id(), "global error capture installed");
    }
}

impl std::fmt::Debug for LoggerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerContext")
            .field("state", &self.state())
            .field("network", &self.network)
            .field("events", &self.events)
            .finish()
    }
}
