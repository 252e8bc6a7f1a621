//! # Log Funnel
//!
//! Many producer threads, one writer. Producers turn log calls into events
//! and push them onto a shared transport; a single dispatcher thread drains
//! it, routes each event by its origin name and writes it to the matching
//! sinks. Only the dispatcher ever touches a sink.
//!
//! ## Features
//!
//! - **Single writer**: console, file and rotating file sinks, each opened
//!   and written only by the dispatcher
//! - **Routing**: longest dot-prefix match on the origin name, with
//!   per-route and per-sink severity thresholds
//! - **Ordered lifecycle**: the dispatcher reports ready before producers
//!   start; shutdown joins producers, then sends one sentinel
//! - **Backpressure**: unbounded by default, or bounded with a block,
//!   timeout, reject or drop policy
//!
//! ## Example
//!
//! ```
//! use log_funnel::prelude::*;
//! use log_funnel::sinks::SharedBuffer;
//!
//! let buffer = SharedBuffer::new();
//! let mut funnel = Funnel::builder()
//!     .attach_sink(
//!         Sink::new("console", ConsoleSink::with_writer(buffer.clone()))
//!             .with_min_severity(Severity::Info)
//!             .with_format(LineFormat::Simple),
//!     )
//!     .route(Route::new("a.b", Severity::Trace, ["console"]))
//!     .start()
//!     .unwrap();
//!
//! let worker = funnel
//!     .spawn_producer("worker-1", |producer| {
//!         producer.debug("a.b.c", "filtered by the sink").unwrap();
//!         producer.info("a.b.c", "hello").unwrap();
//!     })
//!     .unwrap();
//!
//! funnel.stop_after(vec![worker]).unwrap();
//! assert_eq!(buffer.lines(), vec!["a.b.c INFO worker-1 hello"]);
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        DispatchStats, Event, Funnel, FunnelBuilder, FunnelConfig, FunnelMetrics, LineFormat,
        LoggerError, OverflowCallback, OverflowPolicy, Producer, ProducerHandle, Result, Route,
        Severity, TimestampFormat, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{
        ConsoleSink, ConsoleStream, FileMode, FileSink, RotatingFileSink, RotationPolicy,
        RotationStrategy, Sink, SinkSpec,
    };
}

pub use crate::core::{
    DispatchStats, Dispatcher, DispatcherConfig, ErrorCategory, Event, Funnel, FunnelBuilder,
    FunnelConfig, FunnelMetrics, LineFormat, LoggerError, OverflowCallback, OverflowPolicy,
    Producer, ProducerHandle, Result, Route, RouteTable, Severity, TimestampFormat,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use crate::sinks::{Sink, SinkSpec};
