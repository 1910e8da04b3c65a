//! Reference-counted "network busy" indicator.
//!
//! Several requests can be in flight at once (a forecast fetch started
//! while a snapshot fetch is pending), so the indicator is driven by a
//! counter rather than toggled per request: it turns on when the first
//! request starts and off only when the last one finishes.

use std::sync::{Arc, Mutex, PoisonError};

/// Receives busy/idle transitions. Implemented by the presentation layer
/// (e.g. a spinner).
///
/// Calls are made while the activity counter is locked, so implementations
/// must not start or finish requests from inside [`set_busy`](Self::set_busy).
pub trait ActivityIndicator: Send + Sync {
    fn set_busy(&self, busy: bool);
}

/// An [`ActivityIndicator`] that ignores all transitions.
pub struct NullIndicator;

impl ActivityIndicator for NullIndicator {
    fn set_busy(&self, _busy: bool) {}
}

struct Inner {
    in_flight: Mutex<usize>,
    indicator: Arc<dyn ActivityIndicator>,
}

/// Shared counter of in-flight requests. Cloning shares the count.
#[derive(Clone)]
pub struct NetworkActivity {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for NetworkActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkActivity")
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl Default for NetworkActivity {
    fn default() -> Self {
        Self::new(Arc::new(NullIndicator))
    }
}

impl NetworkActivity {
    #[must_use]
    pub fn new(indicator: Arc<dyn ActivityIndicator>) -> Self {
        Self {
            inner: Arc::new(Inner {
                in_flight: Mutex::new(0),
                indicator,
            }),
        }
    }

    /// Marks a request as started. The request counts as finished when the
    /// returned guard is dropped, including on early return or panic.
    #[must_use = "the request is considered finished as soon as the guard is dropped"]
    pub fn begin(&self) -> ActivityGuard {
        let mut count = self.lock();
        *count += 1;
        if *count == 1 {
            self.inner.indicator.set_busy(true);
        }
        drop(count);
        ActivityGuard {
            activity: self.clone(),
        }
    }

    /// Number of requests currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        *self.lock()
    }

    fn end(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.inner.indicator.set_busy(false);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps one request counted as in flight until dropped.
#[derive(Debug)]
pub struct ActivityGuard {
    activity: NetworkActivity,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.activity.end();
    }
}
