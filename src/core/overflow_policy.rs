//! Backpressure policies for a bounded transport
//!
//! An unbounded transport never applies a policy. When a capacity is set,
//! the policy decides what a producer experiences once the queue is full.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling a full bounded transport
///
/// # Example
///
/// ```
/// use log_funnel::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: the producer waits for space
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::Block);
///
/// // Wait a little, then report the failure to the producer
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", content = "timeout", rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Block until space is available
    ///
    /// No event is ever lost; slow sinks slow the producers down.
    #[default]
    Block,

    /// Block with timeout, then fail the send
    ///
    /// The producer receives `LoggerError::SendTimeout` and decides what to do.
    BlockWithTimeout(#[serde(with = "humantime_serde")] Duration),

    /// Fail the send immediately with `LoggerError::QueueFull`
    Reject,

    /// Discard the new event and count it
    ///
    /// The send reports success; the loss is only visible in metrics and
    /// through the overflow callback.
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::Reject => write!(f, "Reject"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when events are dropped under `DropNewest`.
/// The parameter is the total count of dropped events so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
