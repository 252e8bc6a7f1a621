//! Producer side: turning log calls into events on the transport
//!
//! A [`Producer`] is an explicit handle. [`configure`] additionally binds one
//! to the calling thread so that the free [`emit`] function and the logging
//! macros reach the transport without threading a handle through the
//! workload. The binding is replace-not-append: configuring a thread twice
//! swaps the handle, it never adds a second emit path. Nothing here ever
//! writes to a sink directly.

use super::{
    error::{LoggerError, Result},
    event::{current_thread_label, Event},
    severity::Severity,
    transport::TransportSender,
};
use std::cell::RefCell;

thread_local! {
    static CURRENT_PRODUCER: RefCell<Option<Producer>> = const { RefCell::new(None) };
}

/// Handle that stamps events with a producer label and sends them.
#[derive(Clone)]
pub struct Producer {
    sender: TransportSender,
    label: String,
    min_severity: Severity,
}

impl Producer {
    pub fn new(sender: TransportSender, label: impl Into<String>) -> Self {
        Self {
            sender,
            label: label.into(),
            min_severity: Severity::Trace,
        }
    }

    /// Skip sending events below `level`.
    ///
    /// Filtering here saves a trip through the transport for events every
    /// route would reject anyway.
    #[must_use]
    pub fn with_min_severity(mut self, level: Severity) -> Self {
        self.min_severity = level;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Build an event and send it.
    ///
    /// Transport failures (full queue under `Reject`, send timeout, dispatcher
    /// gone) are returned to the caller.
    pub fn emit(&self, origin: &str, severity: Severity, message: impl AsRef<str>) -> Result<()> {
        if severity < self.min_severity {
            return Ok(());
        }

        let event = Event::new(origin, severity, message, self.label.as_str());
        self.sender.send(event)
    }

    #[inline]
    pub fn trace(&self, origin: &str, message: impl AsRef<str>) -> Result<()> {
        self.emit(origin, Severity::Trace, message)
    }

    #[inline]
    pub fn debug(&self, origin: &str, message: impl AsRef<str>) -> Result<()> {
        self.emit(origin, Severity::Debug, message)
    }

    #[inline]
    pub fn info(&self, origin: &str, message: impl AsRef<str>) -> Result<()> {
        self.emit(origin, Severity::Info, message)
    }

    #[inline]
    pub fn warning(&self, origin: &str, message: impl AsRef<str>) -> Result<()> {
        self.emit(origin, Severity::Warning, message)
    }

    #[inline]
    pub fn error(&self, origin: &str, message: impl AsRef<str>) -> Result<()> {
        self.emit(origin, Severity::Error, message)
    }

    #[inline]
    pub fn critical(&self, origin: &str, message: impl AsRef<str>) -> Result<()> {
        self.emit(origin, Severity::Critical, message)
    }
}

/// What [`configure`] did to the calling thread's binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    Installed,
    /// A previous binding existed and was swapped out
    Replaced,
}

/// Bind the calling thread to `sender`, labelled with the thread's name or id
pub fn configure(sender: &TransportSender) -> ConfigureOutcome {
    configure_with(Producer::new(sender.clone(), current_thread_label()))
}

/// Bind the calling thread to `sender` with an explicit producer label
pub fn configure_labeled(sender: &TransportSender, label: impl Into<String>) -> ConfigureOutcome {
    configure_with(Producer::new(sender.clone(), label))
}

/// Bind the calling thread to a prepared producer
pub fn configure_with(producer: Producer) -> ConfigureOutcome {
    CURRENT_PRODUCER.with(|slot| match slot.borrow_mut().replace(producer) {
        Some(_) => ConfigureOutcome::Replaced,
        None => ConfigureOutcome::Installed,
    })
}

/// Emit through the calling thread's binding.
///
/// Fails with `LoggerError::NotConfigured` when the thread was never
/// configured; there is no fallback sink.
pub fn emit(origin: &str, severity: Severity, message: impl AsRef<str>) -> Result<()> {
    CURRENT_PRODUCER.with(|slot| match slot.borrow().as_ref() {
        Some(producer) => producer.emit(origin, severity, message),
        None => Err(LoggerError::NotConfigured {
            thread: current_thread_label(),
        }),
    })
}

pub fn is_configured() -> bool {
    CURRENT_PRODUCER.with(|slot| slot.borrow().is_some())
}

/// Label of the calling thread's binding, if any
pub fn current_label() -> Option<String> {
    CURRENT_PRODUCER.with(|slot| slot.borrow().as_ref().map(|p| p.label.clone()))
}

/// Remove the calling thread's binding. Returns whether one existed.
pub fn reset() -> bool {
    CURRENT_PRODUCER.with(|slot| slot.borrow_mut().take().is_some())
}
