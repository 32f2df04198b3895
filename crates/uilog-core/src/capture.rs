//! Global error capture.
//!
//! [`GlobalEvents`] is a small listener registry for two kinds of uncaught
//! failures:
//!
//! - [`ErrorEvent`]: an uncaught error with a source location. The panic
//!   hook installed by [`GlobalEvents::install_panic_hook`] turns panics into
//!   these.
//! - [`RejectionEvent`]: a failure nobody handled. [`GlobalEvents::watch_task`]
//!   turns failed or panicked background tasks into these.
//!
//! Listeners run in registration order. A listener that calls
//! `stop_propagation()` ends dispatch for that event.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// An uncaught error with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Error text
    pub message: String,
    /// Source file
    pub filename: String,
    /// Line number
    pub lineno: u32,
    /// Column number
    pub colno: u32,
    propagation_stopped: bool,
}

impl ErrorEvent {
    /// Create an error event.
    pub fn new(message: impl Into<String>, filename: impl Into<String>, lineno: u32, colno: u32) -> Self {
        Self {
            message: message.into(),
            filename: filename.into(),
            lineno,
            colno,
            propagation_stopped: false,
        }
    }

    /// Stop later listeners and the default handling from seeing this event.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether a listener stopped propagation.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error: {} at {}:{}:{}",
            self.message, self.filename, self.lineno, self.colno
        )
    }
}

/// A failure that nothing handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionEvent {
    /// Rejection reason
    pub reason: String,
    propagation_stopped: bool,
}

impl RejectionEvent {
    /// Create a rejection event.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            propagation_stopped: false,
        }
    }

    /// Stop later listeners from seeing this event.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether a listener stopped propagation.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl fmt::Display for RejectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unhandled Rejection: {}", self.reason)
    }
}

/// Handle returned when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ErrorListener = Arc<dyn Fn(&mut ErrorEvent) + Send + Sync>;
type RejectionListener = Arc<dyn Fn(&mut RejectionEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    error: Mutex<Vec<(ListenerId, ErrorListener)>>,
    rejection: Mutex<Vec<(ListenerId, RejectionListener)>>,
    next_id: AtomicU64,
    panic_hook: AtomicBool,
}

impl Registry {
    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Registry of global error and rejection listeners.
///
/// Cloning is cheap; clones share listeners.
#[derive(Clone, Default)]
pub struct GlobalEvents {
    registry: Arc<Registry>,
}

impl GlobalEvents {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an error listener.
    pub fn add_error_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&mut ErrorEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id();
        self.registry
            .error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    /// Register a rejection listener.
    pub fn add_rejection_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&mut RejectionEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id();
        self.registry
            .rejection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.registry
            .error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(lid, _)| {
                let keep = *lid != id;
                removed |= !keep;
                keep
            });
        self.registry
            .rejection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(lid, _)| {
                let keep = *lid != id;
                removed |= !keep;
                keep
            });
        removed
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.registry
            .error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.registry
            .rejection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of registered listeners, errors and rejections combined.
    pub fn listener_count(&self) -> usize {
        let errors = self.registry.error.lock().unwrap_or_else(|e| e.into_inner()).len();
        let rejections = self
            .registry
            .rejection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len();
        errors + rejections
    }

    /// Deliver an error event to the listeners and return it.
    pub fn dispatch_error(&self, mut event: ErrorEvent) -> ErrorEvent {
        let listeners: Vec<ErrorListener> = self
            .registry
            .error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            listener(&mut event);
            if event.is_propagation_stopped() {
                break;
            }
        }
        event
    }

    /// Deliver a rejection event to the listeners and return it.
    pub fn dispatch_rejection(&self, mut event: RejectionEvent) -> RejectionEvent {
        let listeners: Vec<RejectionListener> = self
            .registry
            .rejection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            listener(&mut event);
            if event.is_propagation_stopped() {
                break;
            }
        }
        event
    }

    /// Route panics through the error listeners.
    ///
    /// The previously installed hook still runs unless a listener stopped
    /// propagation. Returns `false` if this registry already installed its
    /// hook.
    pub fn install_panic_hook(&self) -> bool {
        if self.registry.panic_hook.swap(true, Ordering::SeqCst) {
            return false;
        }

        let events = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let message = panic_message(info.payload());
            let (filename, lineno, colno) = info
                .location()
                .map(|l| (l.file().to_string(), l.line(), l.column()))
                .unwrap_or_else(|| ("<unknown>".to_string(), 0, 0));

            let event = events.dispatch_error(ErrorEvent::new(message, filename, lineno, colno));
            if !event.is_propagation_stopped() {
                previous(info);
            }
        }));
        tracing::debug!("panic hook installed");
        true
    }

    /// Whether this registry installed its panic hook.
    pub fn panic_hook_installed(&self) -> bool {
        self.registry.panic_hook.load(Ordering::SeqCst)
    }

    /// Report the outcome of a background task.
    ///
    /// An `Err` result or a panic is dispatched as a [`RejectionEvent`]. The
    /// returned handle resolves to the task's value, or `None` if it failed.
    pub fn watch_task<T, E>(&self, handle: JoinHandle<Result<T, E>>) -> JoinHandle<Option<T>>
    where
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let events = self.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(value)) => Some(value),
                Ok(Err(e)) => {
                    events.dispatch_rejection(RejectionEvent::new(e.to_string()));
                    None
                }
                Err(join) if join.is_panic() => {
                    let reason = panic_message(join.into_panic().as_ref());
                    events.dispatch_rejection(RejectionEvent::new(reason));
                    None
                }
                Err(_) => None,
            }
        })
    }
}

impl fmt::Debug for GlobalEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalEvents")
            .field("listeners", &self.listener_count())
            .field("panic_hook", &self.panic_hook_installed())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
