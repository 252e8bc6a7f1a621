//! Multi-producer, single-consumer transport between producers and the dispatcher

use super::{
    error::{LoggerError, Result},
    event::{Event, Message},
    metrics::FunnelMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
};
use crossbeam_channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Capacity and backpressure settings for the transport
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// `None` means unbounded
    pub capacity: Option<usize>,
    /// Only consulted when `capacity` is set
    pub overflow: OverflowPolicy,
}

impl TransportConfig {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            capacity: Some(capacity),
            overflow,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == Some(0) {
            return Err(LoggerError::config(
                "transport",
                "capacity must be at least 1 (use None for unbounded)",
            ));
        }
        Ok(())
    }
}

/// Create a connected sender/receiver pair
pub fn transport(
    config: &TransportConfig,
    metrics: Arc<FunnelMetrics>,
    on_overflow: Option<OverflowCallback>,
) -> (TransportSender, TransportReceiver) {
    let (sender, receiver) = match config.capacity {
        Some(capacity) => bounded(capacity),
        None => unbounded(),
    };

    (
        TransportSender {
            inner: sender,
            capacity: config.capacity,
            overflow: config.overflow,
            metrics,
            on_overflow,
        },
        TransportReceiver { inner: receiver },
    )
}

/// Producer side of the transport. Cheap to clone, safe to share.
#[derive(Clone)]
pub struct TransportSender {
    inner: Sender<Message>,
    capacity: Option<usize>,
    overflow: OverflowPolicy,
    metrics: Arc<FunnelMetrics>,
    on_overflow: Option<OverflowCallback>,
}

impl TransportSender {
    /// Enqueue an event, applying the overflow policy if the queue is bounded and full
    pub fn send(&self, event: Event) -> Result<()> {
        let message = Message::Event(event);

        match self.capacity {
            None => {
                self.inner
                    .send(message)
                    .map_err(|_| LoggerError::ChannelSendError)?;
            }
            Some(max) => match self.inner.try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(message)) => return self.handle_overflow(message, max),
                Err(TrySendError::Disconnected(_)) => return Err(LoggerError::ChannelSendError),
            },
        }

        self.metrics.record_sent();
        Ok(())
    }

    /// Enqueue the shutdown sentinel.
    ///
    /// Always waits for space regardless of the overflow policy; the sentinel
    /// is never dropped or rejected.
    pub fn send_shutdown(&self) -> Result<()> {
        self.inner
            .send(Message::Shutdown)
            .map_err(|_| LoggerError::ChannelSendError)
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn metrics(&self) -> &Arc<FunnelMetrics> {
        &self.metrics
    }

    fn handle_overflow(&self, message: Message, max: usize) -> Result<()> {
        self.metrics.record_queue_full();

        match self.overflow {
            OverflowPolicy::Block => {
                self.metrics.record_block();
                self.inner
                    .send(message)
                    .map_err(|_| LoggerError::ChannelSendError)?;
            }

            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match self.inner.send_timeout(message, timeout) {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => {
                        return Err(LoggerError::SendTimeout {
                            timeout_ms: timeout.as_millis() as u64,
                        });
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {
                        return Err(LoggerError::ChannelSendError);
                    }
                }
            }

            OverflowPolicy::Reject => {
                return Err(LoggerError::queue_full(self.inner.len(), max));
            }

            OverflowPolicy::DropNewest => {
                self.alert_and_drop();
                return Ok(());
            }
        }

        self.metrics.record_sent();
        Ok(())
    }

    fn alert_and_drop(&self) {
        let dropped_count = self.metrics.record_dropped();

        // Alert on first drop and periodically thereafter
        if dropped_count == 0 || (dropped_count + 1) % 1000 == 0 {
            eprintln!(
                "[LOG-FUNNEL WARNING] Transport full, {} events dropped. \
                 Consider a larger capacity or a blocking overflow policy.",
                dropped_count + 1
            );

            if let Some(ref callback) = self.on_overflow {
                callback(dropped_count + 1);
            }
        }
    }
}

/// Consumer side of the transport. Not cloneable: there is exactly one dispatcher.
pub struct TransportReceiver {
    inner: Receiver<Message>,
}

impl TransportReceiver {
    /// Block until the next event or the sentinel arrives
    pub fn receive(&self) -> Result<Message> {
        self.inner
            .recv()
            .map_err(|_| LoggerError::ChannelReceiveError)
    }

    /// Like [`receive`](Self::receive) but gives up after `timeout`, returning `Ok(None)`
    pub fn receive_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        match self.inner.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(LoggerError::ChannelReceiveError),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
