use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing what a router did with the messages it received.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Messages handed to `handle_message`
    pub received: AtomicU64,
    /// Messages dropped because of their shape
    pub rejected: AtomicU64,
    /// Well-formed messages naming an unregistered function
    pub not_found: AtomicU64,
    /// Calls handed to a handler
    pub dispatched: AtomicU64,
    /// Handlers that panicked while being invoked
    pub handler_panics: AtomicU64,
    /// Replies written to the host instance
    pub replies_delivered: AtomicU64,
    /// Replies discarded (empty callback id or serialization failure)
    pub replies_dropped: AtomicU64,
    /// Replies that had to hop back to their originating runner
    pub redirects: AtomicU64,
}

/// Point-in-time copy of [`RouterMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub rejected: u64,
    pub not_found: u64,
    pub dispatched: u64,
    pub handler_panics: u64,
    pub replies_delivered: u64,
    pub replies_dropped: u64,
    pub redirects: u64,
}

impl RouterMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_panic(&self) {
        self.handler_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply_delivered(&self) {
        self.replies_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply_dropped(&self) {
        self.replies_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redirect(&self) {
        self.redirects.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
            replies_delivered: self.replies_delivered.load(Ordering::Relaxed),
            replies_dropped: self.replies_dropped.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
        }
    }
}
