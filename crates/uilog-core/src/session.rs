//! The session controller.
//!
//! A [`UiLogger`] is the public entry point: `log`, `error` and `flush`.
//! Each call builds a protocol message from the frozen configuration and
//! posts it to the buffer worker without waiting. The logger also owns the
//! idle timer that turns a quiet period into an automatic flush.
//!
//! Loggers are normally obtained from a [`LoggerContext`](crate::LoggerContext),
//! which makes sure there is only one per context.

use crate::buffer::BufferWorker;
use crate::config::ResolvedConfig;
use crate::delivery::Transport;
use crate::envelope::{ErrorDetail, ErrorInput, EventEnvelope};
use crate::error::{Error, Result};
use crate::host::HostEnvironment;
use crate::idle::IdleTimer;
use crate::network::NetworkInterceptor;
use crate::protocol::{Dispatcher, MessageKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) struct LoggerInner {
    dispatcher: Dispatcher,
    config: ResolvedConfig,
    host: Arc<dyn HostEnvironment>,
    network: NetworkInterceptor,
    idle: IdleTimer,
    disposed: AtomicBool,
}

/// Handle to a running logger session.
///
/// Cloning is cheap and every clone refers to the same session.
#[derive(Clone)]
pub struct UiLogger {
    inner: Arc<LoggerInner>,
}

/// Runtime parameters for spawning a session.
pub(crate) struct SessionParts {
    pub host: Arc<dyn HostEnvironment>,
    pub transport: Arc<dyn Transport>,
    pub network: NetworkInterceptor,
    pub channel_capacity: usize,
    pub debounce: Duration,
}

impl UiLogger {
    /// Spawn the buffer worker and idle timer and return the handle.
    pub(crate) fn spawn(config: ResolvedConfig, parts: SessionParts) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let session_id = parts.host.random_id();
        let is_dev = parts.host.is_dev();

        let (sender, receiver) = mpsc::channel(parts.channel_capacity.max(1));
        let worker = BufferWorker::new(receiver, parts.transport, parts.host.clone());
        runtime.spawn(worker.run());

        let dispatcher = Dispatcher::new(sender, config.clone(), is_dev, session_id);

        let on_idle = dispatcher.clone();
        let idle = IdleTimer::start(config.idle_time, parts.debounce, move || {
            if let Err(e) = on_idle.post(MessageKind::Flush, "") {
                tracing::trace!(error = %e, "idle flush skipped");
            }
        });

        tracing::info!(
            session_id = %dispatcher.session_id(),
            is_dev,
            max_log_size = config.max_log_size,
            idle_time_ms = u64::try_from(config.idle_time.as_millis()).unwrap_or(u64::MAX),
            "ui logger started"
        );

        Ok(Self {
            inner: Arc::new(LoggerInner {
                dispatcher,
                config,
                host: parts.host,
                network: parts.network,
                idle,
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Buffer a log line and reset the idle timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] once the logger has been disposed.
    pub fn log(&self, message: impl Into<String>) -> Result<()> {
        self.ensure_active()?;

        let mut message = message.into();
        if self.inner.config.enable_timestamps {
            message = format!("{} {}", self.timestamp_prefix(), message);
        }

        self.inner.dispatcher.post(MessageKind::Log, message)?;
        self.inner.idle.reset();
        Ok(())
    }

    /// Record an error together with the last observed network call.
    ///
    /// Accepts plain text or anything convertible to [`ErrorInput`]. Does not
    /// count as activity for the idle timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] once the logger has been disposed, or
    /// [`Error::Serialization`] if the error detail cannot be encoded.
    pub fn error(&self, error: impl Into<ErrorInput>) -> Result<()> {
        self.ensure_active()?;

        let input = error.into();
        tracing::debug!(
            session_id = %self.session_id(),
            error = %input.message,
            "error reported"
        );

        let detail = ErrorDetail::new(input, self.inner.network.last_call(), self.inner.host.now_millis());
        let message = detail.to_message()?;
        self.inner.dispatcher.post(MessageKind::Error, message)
    }

    /// Record a `std::error::Error`, including its source chain.
    ///
    /// # Errors
    ///
    /// Same as [`error`](Self::error).
    pub fn error_from<E>(&self, err: &E) -> Result<()>
    where
        E: std::error::Error + ?Sized,
    {
        self.error(ErrorInput::from_error(err))
    }

    /// Ask the worker to deliver the buffer.
    ///
    /// Delivery only happens when `sendDebugLogToApi` is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] once the logger has been disposed.
    pub fn flush(&self) -> Result<()> {
        self.ensure_active()?;
        self.inner.dispatcher.post(MessageKind::Flush, "")
    }

    /// Session identifier generated at construction.
    pub fn session_id(&self) -> &str {
        self.inner.dispatcher.session_id()
    }

    /// The configuration this session runs with.
    pub fn config(&self) -> &ResolvedConfig {
        &self.inner.config
    }

    /// Whether the session runs in development mode.
    pub fn is_dev(&self) -> bool {
        self.inner.dispatcher.is_dev()
    }

    /// The network interceptor whose last call errors are correlated with.
    pub fn network_interceptor(&self) -> &NetworkInterceptor {
        &self.inner.network
    }

    /// Snapshot of the worker's buffer.
    ///
    /// The request travels through the same channel as `log`/`error`/`flush`,
    /// so everything posted before this call is reflected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disposed`] once the worker has stopped.
    pub async fn pending(&self) -> Result<Vec<EventEnvelope>> {
        self.inner.dispatcher.inspect().await
    }

    /// Stop the idle timer and the worker.
    ///
    /// Entries still buffered are discarded. Calling this more than once is a
    /// no-op.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.idle.stop();
        self.inner.dispatcher.shutdown().await;
        tracing::debug!(session_id = %self.session_id(), "ui logger disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Whether two handles refer to the same session.
    pub fn ptr_eq(&self, other: &UiLogger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<LoggerInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<LoggerInner>) -> Self {
        Self { inner }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn timestamp_prefix(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.inner.host.now_millis())
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for UiLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiLogger")
            .field("session_id", &self.session_id())
            .field("is_dev", &self.is_dev())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::delivery::DeliveryReceipt;
    use crate::envelope::{DeliveryPayload, EventKind};
    use crate::error::DeliveryResult;
    use crate::network::NetworkCallCell;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<DeliveryPayload>>);

    #[async_trait]
    impl Transport for Collect {
        async fn deliver(&self, _url: &str, payload: &DeliveryPayload) -> DeliveryResult<DeliveryReceipt> {
            self.0.lock().unwrap().push(payload.clone());
            Ok(DeliveryReceipt { status: 200 })
        }
    }

    struct Host {
        hostname: &'static str,
    }

    impl HostEnvironment for Host {
        fn hostname(&self) -> Option<String> {
            Some(self.hostname.to_string())
        }

        fn now_millis(&self) -> i64 {
            1_700_000_000_000
        }

        fn random_id(&self) -> String {
            "session-42".to_string()
        }
    }

    fn spawn(config: SessionConfig, hostname: &'static str) -> (UiLogger, Arc<Collect>) {
        let host: Arc<dyn HostEnvironment> = Arc::new(Host { hostname });
        let transport = Arc::new(Collect::default());
        let network = NetworkInterceptor::new(
            NetworkCallCell::new(),
            Arc::new(AtomicBool::new(false)),
            host.clone(),
        );
        let logger = UiLogger::spawn(
            config.resolve(),
            SessionParts {
                host,
                transport: transport.clone(),
                network,
                channel_capacity: 64,
                debounce: Duration::from_millis(500),
            },
        )
        .unwrap();
        (logger, transport)
    }

    #[test]
    fn test_spawn_outside_runtime_fails() {
        let host: Arc<dyn HostEnvironment> = Arc::new(Host { hostname: "app" });
        let result = UiLogger::spawn(
            ResolvedConfig::default(),
            SessionParts {
                host: host.clone(),
                transport: Arc::new(Collect::default()),
                network: NetworkInterceptor::new(
                    NetworkCallCell::new(),
                    Arc::new(AtomicBool::new(false)),
                    host,
                ),
                channel_capacity: 8,
                debounce: Duration::from_millis(500),
            },
        );
        assert!(matches!(result, Err(Error::NoRuntime)));
    }

    #[tokio::test]
    async fn test_identity_and_dev_mode() {
        let (logger, _) = spawn(SessionConfig::new(), "localhost:3000");
        assert_eq!(logger.session_id(), "session-42");
        assert!(logger.is_dev());
        assert!(logger.ptr_eq(&logger.clone()));

        let (other, _) = spawn(SessionConfig::new(), "app.example.com");
        assert!(!other.is_dev());
        assert!(!logger.ptr_eq(&other));
    }

    #[tokio::test]
    async fn test_log_buffers_in_order() {
        let (logger, _) = spawn(SessionConfig::new(), "app.example.com");
        logger.log("first").unwrap();
        logger.log("second").unwrap();

        let pending = logger.pending().await.unwrap();
        let messages: Vec<_> = pending.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert!(pending.iter().all(|e| e.kind == EventKind::Log));
    }

    #[tokio::test]
    async fn test_timestamp_prefix() {
        let (logger, _) = spawn(SessionConfig::new().enable_timestamps(true), "app.example.com");
        logger.log("hello").unwrap();

        let pending = logger.pending().await.unwrap();
        assert_eq!(pending[0].message, "2023-11-14T22:13:20.000Z hello");
    }

    #[tokio::test]
    async fn test_error_serializes_detail() {
        let (logger, _) = spawn(SessionConfig::new(), "app.example.com");
        logger.error(ErrorInput::new("boom").with_stack("at handler")).unwrap();

        let pending = logger.pending().await.unwrap();
        assert_eq!(pending[0].kind, EventKind::Error);

        let detail: ErrorDetail = serde_json::from_str(&pending[0].message).unwrap();
        assert_eq!(detail.error, "boom");
        assert_eq!(detail.stack.as_deref(), Some("at handler"));
        assert!(detail.last_api_call.is_none());
        assert_eq!(detail.timestamp, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_error_carries_last_call() {
        let (logger, _) = spawn(SessionConfig::new(), "app.example.com");
        let network = logger.network_interceptor();
        network.install();
        network.record_start("https://api.example.com/orders", "POST", None);

        logger.error("checkout failed").unwrap();

        let pending = logger.pending().await.unwrap();
        let detail: ErrorDetail = serde_json::from_str(&pending[0].message).unwrap();
        let call = detail.last_api_call.unwrap();
        assert_eq!(call.url, "https://api.example.com/orders");
        assert_eq!(call.method, "POST");
    }

    #[tokio::test]
    async fn test_dispose_rejects_further_calls() {
        let (logger, _) = spawn(SessionConfig::new(), "app.example.com");
        logger.dispose().await;
        logger.dispose().await;

        assert!(logger.is_disposed());
        assert!(matches!(logger.log("late"), Err(Error::Disposed)));
        assert!(matches!(logger.error("late"), Err(Error::Disposed)));
        assert!(matches!(logger.flush(), Err(Error::Disposed)));
        assert!(logger.pending().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_flush_delivers() {
        let (logger, transport) = spawn(
            SessionConfig::new().idle_time_ms(1000).send_debug_log_to_api(true),
            "app.example.com",
        );
        logger.log("quiet").unwrap();

        tokio::time::sleep(Duration::from_millis(1600)).await;
        let delivered = transport.0.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].decode_logs().unwrap(), vec!["quiet"]);
    }
}
