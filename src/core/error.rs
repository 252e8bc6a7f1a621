//! Error types for the log funnel

use std::fmt;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Coarse classification of a [`LoggerError`].
///
/// The dispatcher contains `SinkWrite` failures; `Transport` failures are
/// surfaced to the emitting producer; `Lifecycle` failures are surfaced to
/// whoever called `start` or `stop_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    SinkWrite,
    Configuration,
    Lifecycle,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::SinkWrite => write!(f, "sink write"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Lifecycle => write!(f, "lifecycle"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Bounded transport is full and the policy rejects the event
    #[error("Log queue full: {current}/{max} events buffered")]
    QueueFull { current: usize, max: usize },

    /// Bounded transport stayed full for the whole send timeout
    #[error("Log queue still full after {timeout_ms}ms")]
    SendTimeout { timeout_ms: u64 },

    /// The consumer side of the transport is gone
    #[error("Failed to send log event to dispatcher")]
    ChannelSendError,

    /// Every sender is gone and the queue is drained
    #[error("Failed to receive log event from transport")]
    ChannelReceiveError,

    /// `emit` was called on a thread that never ran `configure`
    #[error("No log producer configured on thread '{thread}'")]
    NotConfigured { thread: String },

    /// A sink failed to write a formatted line
    #[error("Sink '{sink}' write failed: {message}")]
    SinkWrite { sink: String, message: String },

    /// A sink was written to after it had been closed
    #[error("Sink '{sink}' is closed")]
    SinkClosed { sink: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// File lock error
    #[error("Failed to acquire file lock on '{path}'")]
    FileLockError { path: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A route references a sink that was never declared
    #[error("Route '{prefix}' references unknown sink '{sink}'")]
    UnknownSink { prefix: String, sink: String },

    /// The dispatcher failed to come up
    #[error("Dispatcher failed to start: {message}")]
    StartFailed { message: String },

    /// The dispatcher did not report ready in time
    #[error("Dispatcher did not report ready within {timeout_ms}ms")]
    StartTimeout { timeout_ms: u64 },

    /// The dispatcher did not exit after the shutdown sentinel
    #[error("Dispatcher did not stop within {timeout_ms}ms, pending events may be lost")]
    StopTimeout { timeout_ms: u64 },

    /// The dispatcher thread panicked; its sinks may not have been closed
    #[error("Dispatcher thread panicked: {message}")]
    DispatcherPanicked { message: String },

    /// Funnel already stopped
    #[error("Log funnel already stopped")]
    LoggerStopped,
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a queue full error with buffer details
    pub fn queue_full(current: usize, max: usize) -> Self {
        LoggerError::QueueFull { current, max }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a sink write error
    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a closed sink error
    pub fn sink_closed(sink: impl Into<String>) -> Self {
        LoggerError::SinkClosed { sink: sink.into() }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file lock error
    pub fn file_lock(path: impl Into<String>) -> Self {
        LoggerError::FileLockError { path: path.into() }
    }

    pub fn start_failed(message: impl Into<String>) -> Self {
        LoggerError::StartFailed {
            message: message.into(),
        }
    }

    /// Which part of the pipeline this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            LoggerError::QueueFull { .. }
            | LoggerError::SendTimeout { .. }
            | LoggerError::ChannelSendError
            | LoggerError::ChannelReceiveError
            | LoggerError::NotConfigured { .. } => ErrorCategory::Transport,

            LoggerError::IoOperation { .. }
            | LoggerError::IoError(_)
            | LoggerError::SinkWrite { .. }
            | LoggerError::SinkClosed { .. }
            | LoggerError::FileRotationError { .. }
            | LoggerError::FileLockError { .. } => ErrorCategory::SinkWrite,

            LoggerError::JsonError(_)
            | LoggerError::InvalidConfiguration { .. }
            | LoggerError::UnknownSink { .. } => ErrorCategory::Configuration,

            LoggerError::StartFailed { .. }
            | LoggerError::StartTimeout { .. }
            | LoggerError::StopTimeout { .. }
            | LoggerError::DispatcherPanicked { .. }
            | LoggerError::LoggerStopped => ErrorCategory::Lifecycle,
        }
    }
}
