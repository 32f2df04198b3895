//! Inactivity timer.
//!
//! The timer fires its callback once the configured period passes with no
//! activity. Activity arrives through [`IdleTimer::reset`]; the timer reacts
//! to a burst of activity at most once per debounce window, then re-arms.
//! It fires at most once per idle period: it stays quiet after firing until
//! the next activity.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default debounce window applied to activity signals.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Callback invoked when the idle period elapses.
pub type IdleCallback = Arc<dyn Fn() + Send + Sync>;

/// A restartable inactivity timer running on the Tokio runtime.
///
/// Dropping the timer stops it.
pub struct IdleTimer {
    activity: watch::Sender<Instant>,
    handle: JoinHandle<()>,
    timeout: Duration,
}

impl IdleTimer {
    /// Start the timer. It is armed immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(timeout: Duration, debounce: Duration, on_idle: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (activity, rx) = watch::channel(Instant::now());
        let handle = tokio::spawn(run(rx, timeout, debounce, Arc::new(on_idle)));
        Self {
            activity,
            handle,
            timeout,
        }
    }

    /// Record activity, pushing the deadline out by a full period.
    pub fn reset(&self) {
        self.activity.send_replace(Instant::now());
    }

    /// Stop the timer. The callback will not fire afterwards.
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// The configured idle period.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl std::fmt::Debug for IdleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleTimer")
            .field("timeout", &self.timeout)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

async fn run(
    mut activity: watch::Receiver<Instant>,
    timeout: Duration,
    debounce: Duration,
    on_idle: IdleCallback,
) {
    let mut armed = true;
    loop {
        // `None` when the period is too long to ever elapse.
        let deadline = activity.borrow_and_update().checked_add(timeout);
        tokio::select! {
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if armed && deadline.is_some() => {
                armed = false;
                tracing::trace!("idle period elapsed");
                on_idle();
            }
            changed = activity.changed() => {
                if changed.is_err() {
                    break;
                }
                armed = true;
                // Coalesce a burst of activity into one re-arm.
                tokio::time::sleep(debounce).await;
            }
        }
    }
}
