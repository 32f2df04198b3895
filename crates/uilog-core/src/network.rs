//! Outbound network call capture.
//!
//! The interceptor keeps exactly one record: the most recent outbound call.
//! Errors reported afterwards carry a snapshot of it so the collector can
//! correlate a failure with the request that most likely caused it.
//!
//! Two call shapes are supported:
//!
//! - **Request functions** ([`NetworkInterceptor::fetch`]): wrap the future
//!   of a request, record it before it starts, annotate the status once it
//!   resolves.
//! - **Request objects** ([`NetworkInterceptor::open`]): an `open`/`send`
//!   pair with a completion hook, for clients that build a request in steps.
//!
//! Recording only happens once the interceptor is installed; before that every
//! wrapper is a plain pass-through.

use crate::host::HostEnvironment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// The most recently observed outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastNetworkCall {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Time the call was initiated (epoch milliseconds)
    pub timestamp: i64,
    /// Request payload, when one was sent
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<Value>,
    /// Response status, filled in once the call completes
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<u16>,
}

impl LastNetworkCall {
    /// Create a call record without payload or status.
    pub fn new(url: impl Into<String>, method: impl Into<String>, timestamp: i64) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            timestamp,
            payload: None,
            status: None,
        }
    }

    /// Set the request payload.
    pub fn with_payload(mut self, payload: Option<Value>) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Debug)]
struct Slot {
    call_id: u64,
    call: LastNetworkCall,
}

/// Shared single-slot cell holding the last outbound call.
///
/// Every record overwrites the previous one. A status annotation only lands
/// if the slot still holds the call it belongs to.
#[derive(Debug, Clone, Default)]
pub struct NetworkCallCell {
    slot: Arc<Mutex<Option<Slot>>>,
    next_id: Arc<AtomicU64>,
}

impl NetworkCallCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot and return the id of the new record.
    pub fn record(&self, call: LastNetworkCall) -> u64 {
        let call_id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Slot { call_id, call });
        call_id
    }

    /// Attach a status to the record with `call_id`.
    ///
    /// Returns `false` if a newer call has replaced it in the meantime.
    pub fn annotate_status(&self, call_id: u64, status: u16) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_mut() {
            Some(current) if current.call_id == call_id => {
                current.call.status = Some(status);
                true
            }
            _ => false,
        }
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> Option<LastNetworkCall> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|s| s.call.clone())
    }

    /// Empty the slot.
    pub fn clear(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

/// Anything that carries an HTTP status code.
pub trait ResponseStatus {
    /// The numeric status code.
    fn status_code(&self) -> u16;
}

impl<B> ResponseStatus for http::Response<B> {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl ResponseStatus for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl ResponseStatus for http::StatusCode {
    fn status_code(&self) -> u16 {
        self.as_u16()
    }
}

/// Records outbound calls into a [`NetworkCallCell`].
///
/// Cloning is cheap; all clones share the cell and the installation flag.
#[derive(Clone)]
pub struct NetworkInterceptor {
    cell: NetworkCallCell,
    installed: Arc<AtomicBool>,
    host: Arc<dyn HostEnvironment>,
}

impl NetworkInterceptor {
    /// Create an interceptor writing into `cell`, gated by `installed`.
    pub fn new(
        cell: NetworkCallCell,
        installed: Arc<AtomicBool>,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self {
            cell,
            installed,
            host,
        }
    }

    /// Turn recording on.
    ///
    /// Returns `true` only for the call that actually performed the
    /// installation; later calls are no-ops.
    pub fn install(&self) -> bool {
        let newly = !self.installed.swap(true, Ordering::SeqCst);
        if newly {
            tracing::debug!("network call capture installed");
        }
        newly
    }

    /// Whether recording is on.
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// The cell this interceptor writes to.
    pub fn cell(&self) -> &NetworkCallCell {
        &self.cell
    }

    /// Copy of the last recorded call.
    pub fn last_call(&self) -> Option<LastNetworkCall> {
        self.cell.snapshot()
    }

    /// Record the start of a call. Returns `None` when not installed.
    pub fn record_start(
        &self,
        url: impl Into<String>,
        method: impl Into<String>,
        payload: Option<Value>,
    ) -> Option<u64> {
        if !self.is_installed() {
            return None;
        }
        let call = LastNetworkCall::new(url, method, self.host.now_millis()).with_payload(payload);
        Some(self.cell.record(call))
    }

    /// Record the completion status of a call started with [`record_start`](Self::record_start).
    pub fn record_status(&self, call_id: Option<u64>, status: u16) {
        if let Some(id) = call_id {
            self.cell.annotate_status(id, status);
        }
    }

    /// Wrap a request-function style call.
    ///
    /// The call is recorded before `call` is polled. On success the status is
    /// annotated; the result is returned unchanged either way.
    ///
    /// ```ignore
    /// let response = interceptor
    ///     .fetch(url.as_str(), "GET", None, client.get(url.as_str()).send())
    ///     .await?;
    /// ```
    pub async fn fetch<F, T, E>(
        &self,
        url: impl Into<String>,
        method: impl Into<String>,
        payload: Option<Value>,
        call: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        T: ResponseStatus,
    {
        let call_id = self.record_start(url, method, payload);
        let result = call.await;
        if let Ok(response) = &result {
            self.record_status(call_id, response.status_code());
        }
        result
    }

    /// Start a request-object style call.
    pub fn open(&self, method: impl Into<String>, url: impl Into<String>) -> TrackedRequest {
        TrackedRequest {
            interceptor: self.clone(),
            pending: LastNetworkCall::new(url, method, self.host.now_millis()),
            call_id: None,
        }
    }
}

impl std::fmt::Debug for NetworkInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkInterceptor")
            .field("installed", &self.is_installed())
            .field("last_call", &self.cell.snapshot())
            .finish()
    }
}

/// A request built in steps: `open`, then `send`, then `complete`.
///
/// `open` captures url, method and time in a per-request slot. `send` adds the
/// payload and promotes the entry to the shared cell. `complete` records the
/// final status on that same entry.
#[derive(Debug)]
pub struct TrackedRequest {
    interceptor: NetworkInterceptor,
    pending: LastNetworkCall,
    call_id: Option<u64>,
}

impl TrackedRequest {
    /// Attach the payload and publish this request as the last call.
    pub fn send(&mut self, payload: Option<Value>) {
        self.pending.payload = payload;
        if self.interceptor.is_installed() {
            self.call_id = Some(self.interceptor.cell.record(self.pending.clone()));
        }
    }

    /// Record the final status once the request completes.
    pub fn complete(self, status: u16) {
        self.interceptor.record_status(self.call_id, status);
    }

    /// The per-request entry as captured so far.
    pub fn entry(&self) -> &LastNetworkCall {
        &self.pending
    }
}
