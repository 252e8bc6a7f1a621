//! Funnel metrics for observability
//!
//! Counters shared by producers (send side) and the dispatcher (delivery
//! side). All counters use relaxed atomics; a `clone()` is a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for funnel observability
///
/// # Example
///
/// ```
/// use log_funnel::FunnelMetrics;
///
/// let metrics = FunnelMetrics::new();
/// metrics.record_sent();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.events_sent(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct FunnelMetrics {
    /// Events accepted by the transport
    events_sent: AtomicU64,

    /// Events discarded on the send side (DropNewest policy)
    dropped_count: AtomicU64,

    /// Number of times a bounded transport was found full
    queue_full_events: AtomicU64,

    /// Number of times a producer had to wait for queue space
    block_events: AtomicU64,

    /// Events taken off the transport by the dispatcher
    events_received: AtomicU64,

    /// Formatted lines successfully written to a sink
    lines_delivered: AtomicU64,

    /// Events whose origin matched no route
    unrouted_events: AtomicU64,

    /// Sink writes that failed or panicked
    sink_failures: AtomicU64,
}

impl FunnelMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            events_sent: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            events_received: AtomicU64::new(0),
            lines_delivered: AtomicU64::new(0),
            unrouted_events: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn events_sent(&self) -> u64 {
        self.events_sent.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn lines_delivered(&self) -> u64 {
        self.lines_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn unrouted_events(&self) -> u64 {
        self.unrouted_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    /// Record an event accepted by the transport
    #[inline]
    pub fn record_sent(&self) -> u64 {
        self.events_sent.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped event, returns the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_received(&self) -> u64 {
        self.events_received.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.lines_delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_unrouted(&self) -> u64 {
        self.unrouted_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Get send-side drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been emitted.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.events_sent() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }
}

impl Default for FunnelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FunnelMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            events_sent: AtomicU64::new(self.events_sent()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
            events_received: AtomicU64::new(self.events_received()),
            lines_delivered: AtomicU64::new(self.lines_delivered()),
            unrouted_events: AtomicU64::new(self.unrouted_events()),
            sink_failures: AtomicU64::new(self.sink_failures()),
        }
    }
}
