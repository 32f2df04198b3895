use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use uilog_core::HostEnvironment;

/// Host environment with a manual clock and sequential ids.
///
/// Clones share the clock and the id counter, so a test can keep one clone
/// and move time forward while the logger holds another.
#[derive(Debug, Clone)]
pub struct FixedHost {
    hostname: Option<String>,
    now: Arc<AtomicI64>,
    next_id: Arc<AtomicU64>,
}

impl FixedHost {
    /// Production-like host (`app.example.com`) starting at `now` epoch ms.
    pub fn new(now: i64) -> Self {
        Self {
            hostname: Some("app.example.com".to_string()),
            now: Arc::new(AtomicI64::new(now)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Development host (`localhost`).
    pub fn localhost(now: i64) -> Self {
        Self::new(now).with_hostname("localhost:5173")
    }

    /// Replace the host address.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the clock.
    pub fn set_now(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Default for FixedHost {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

impl HostEnvironment for FixedHost {
    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }

    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn random_id(&self) -> String {
        format!("session-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}
