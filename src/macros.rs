//! Logging macros for producer threads.
//!
//! Each macro formats its arguments like `format!` and emits through the
//! calling thread's configured producer. They return `log_funnel::Result<()>`;
//! on a thread that was never configured the result is
//! `LoggerError::NotConfigured`.
//!
//! # Examples
//!
//! ```
//! use log_funnel::prelude::*;
//! use log_funnel::{info, error};
//!
//! // Not configured yet: nothing is written anywhere
//! assert!(info!("a.b.c", "Server started").is_err());
//!
//! let mut funnel = Funnel::builder()
//!     .sink("console", SinkSpec::console(ConsoleStream::Stderr))
//!     .route(Route::root(Severity::Info, ["console"]))
//!     .start()
//!     .unwrap();
//!
//! let worker = funnel
//!     .spawn_producer("worker-1", |_| {
//!         let port = 8080;
//!         info!("a.b.c", "Server listening on port {}", port).unwrap();
//!         error!("d.e.f", "Request {} failed", 42).unwrap();
//!     })
//!     .unwrap();
//!
//! funnel.stop_after(vec![worker]).unwrap();
//! ```

/// Emit at an explicit severity.
///
/// ```
/// # use log_funnel::Severity;
/// use log_funnel::emit;
/// let _ = emit!("a.b", Severity::Warning, "Disk at {}%", 91);
/// ```
#[macro_export]
macro_rules! emit {
    ($origin:expr, $severity:expr, $($arg:tt)+) => {
        $crate::core::producer::emit($origin, $severity, format!($($arg)+))
    };
}

#[macro_export]
macro_rules! trace {
    ($origin:expr, $($arg:tt)+) => {
        $crate::emit!($origin, $crate::Severity::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($origin:expr, $($arg:tt)+) => {
        $crate::emit!($origin, $crate::Severity::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($origin:expr, $($arg:tt)+) => {
        $crate::emit!($origin, $crate::Severity::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($origin:expr, $($arg:tt)+) => {
        $crate::emit!($origin, $crate::Severity::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($origin:expr, $($arg:tt)+) => {
        $crate::emit!($origin, $crate::Severity::Error, $($arg)+)
    };
}

/// Emit at `Critical`, the highest severity.
#[macro_export]
macro_rules! critical {
    ($origin:expr, $($arg:tt)+) => {
        $crate::emit!($origin, $crate::Severity::Critical, $($arg)+)
    };
}
