//! Core funnel types: events, transport, routing, dispatch and lifecycle

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod funnel;
pub mod line_format;
pub mod metrics;
pub mod overflow_policy;
pub mod producer;
pub mod route;
pub mod severity;
pub mod timestamp;
pub mod transport;

pub use dispatcher::{
    DispatchStats, Dispatcher, DispatcherConfig, DispatcherState, DEFAULT_DISPATCHER_LABEL,
};
pub use error::{ErrorCategory, LoggerError, Result};
pub use event::{current_thread_label, Event, Message};
pub use funnel::{
    Funnel, FunnelBuilder, FunnelConfig, ProducerHandle, DEFAULT_SHUTDOWN_TIMEOUT,
    DEFAULT_START_TIMEOUT,
};
pub use line_format::LineFormat;
pub use metrics::FunnelMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use producer::{ConfigureOutcome, Producer};
pub use route::{Route, RouteTable};
pub use severity::Severity;
pub use timestamp::TimestampFormat;
pub use transport::{transport, TransportConfig, TransportReceiver, TransportSender};
