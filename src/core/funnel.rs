//! Lifecycle: start the dispatcher, run producers, shut down in order
//!
//! A [`Funnel`] only exists once its dispatcher has opened every sink and
//! reported ready, so any producer spawned from it has a live consumer.
//! [`Funnel::stop_after`] joins the producers first, then sends the single
//! shutdown sentinel, then waits for the dispatcher to close its sinks.

use super::{
    dispatcher::{panic_message, DispatchStats, Dispatcher, DispatcherConfig},
    error::{LoggerError, Result},
    metrics::FunnelMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    producer::{configure_with, reset, Producer},
    route::Route,
    transport::{transport, TransportConfig, TransportSender},
};
use crate::sinks::{Sink, SinkSpec};
use crossbeam_channel::RecvTimeoutError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default time to wait for the dispatcher to drain and exit (5 seconds)
///
/// Also used when a funnel is dropped without an explicit stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time to wait for the dispatcher to open its sinks (5 seconds)
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to start a funnel
///
/// # Example
///
/// ```
/// use log_funnel::FunnelConfig;
///
/// let config = FunnelConfig::from_json_str(r#"{
///     "transport": {"capacity": 1024, "overflow": {"policy": "block"}},
///     "dispatcher": {
///         "routes": [{"sinks": ["console"]}],
///         "sinks": [["console", {"kind": "console", "min_severity": "INFO"}]]
///     },
///     "shutdown_timeout": "2s"
/// }"#).unwrap();
///
/// assert_eq!(config.transport.capacity, Some(1024));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelConfig {
    pub transport: TransportConfig,
    pub dispatcher: DispatcherConfig,
    #[serde(with = "humantime_serde")]
    pub start_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            dispatcher: DispatcherConfig::default(),
            start_timeout: DEFAULT_START_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl FunnelConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "read funnel config",
                format!("Cannot read '{}'", path.display()),
                e,
            )
        })?;
        Self::from_json_str(&json)
    }

    /// Validate without opening any sink. `attached` names prebuilt sinks.
    pub fn validate<'a>(&'a self, attached: impl IntoIterator<Item = &'a str>) -> Result<()> {
        self.transport.validate()?;
        if self.start_timeout.is_zero() {
            return Err(LoggerError::config("funnel", "start timeout must be non-zero"));
        }
        self.dispatcher.validate(attached)
    }
}

/// Builder for constructing a [`Funnel`] with a fluent API
///
/// # Example
///
/// ```no_run
/// use log_funnel::prelude::*;
///
/// let funnel = Funnel::builder()
///     .sink("console", SinkSpec::console(ConsoleStream::Stderr).with_min_severity(Severity::Info))
///     .sink("errors", SinkSpec::file("logs/errors.log", FileMode::Truncate)
///         .with_min_severity(Severity::Error))
///     .route(Route::root(Severity::Debug, ["console", "errors"]))
///     .start()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct FunnelBuilder {
    config: FunnelConfig,
    attached: Vec<Sink>,
    on_overflow: Option<OverflowCallback>,
}

impl FunnelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration
    pub fn from_config(config: FunnelConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Register a route; earlier routes win prefix-length ties
    #[must_use = "builder methods return a new value"]
    pub fn route(mut self, route: Route) -> Self {
        self.config.dispatcher.routes.push(route);
        self
    }

    /// Declare a sink the dispatcher opens at start
    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, name: impl Into<String>, spec: SinkSpec) -> Self {
        self.config.dispatcher.sinks.push((name.into(), spec));
        self
    }

    /// Hand over a sink that is already built, e.g. one writing to a buffer
    #[must_use = "builder methods return a new value"]
    pub fn attach_sink(mut self, sink: Sink) -> Self {
        self.attached.push(sink);
        self
    }

    /// Bound the transport. Without this it is unbounded.
    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.transport.capacity = Some(capacity);
        self
    }

    /// What producers experience when a bounded transport is full
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.transport.overflow = policy;
        self
    }

    /// Called with the running drop count when `DropNewest` discards events
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Print producers as `<dispatcher label> (for <producer>)`
    #[must_use = "builder methods return a new value"]
    pub fn relabel(mut self, enabled: bool) -> Self {
        self.config.dispatcher.relabel = enabled;
        self
    }

    /// Dispatcher thread name
    #[must_use = "builder methods return a new value"]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.dispatcher.label = label.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.config.start_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    pub fn start(self) -> Result<Funnel> {
        Funnel::start_with(self.config, self.attached, self.on_overflow)
    }
}

/// A running producer thread
pub struct ProducerHandle<R> {
    name: String,
    handle: thread::JoinHandle<R>,
}

impl<R> ProducerHandle<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the workload and return its result
    pub fn join(self) -> thread::Result<R> {
        self.handle.join()
    }
}

pub struct Funnel {
    sender: TransportSender,
    dispatcher: Option<thread::JoinHandle<DispatchStats>>,
    stats: Option<DispatchStats>,
    metrics: Arc<FunnelMetrics>,
    label: String,
    shutdown_timeout: Duration,
}

impl Funnel {
    pub fn builder() -> FunnelBuilder {
        FunnelBuilder::new()
    }

    pub fn start(config: FunnelConfig) -> Result<Self> {
        Self::start_with(config, Vec::new(), None)
    }

    /// Spawn the dispatcher and wait for it to report ready.
    ///
    /// Sinks are opened on the dispatcher thread. An open failure comes back
    /// as `StartFailed`; no answer within the start timeout is `StartTimeout`.
    fn start_with(
        config: FunnelConfig,
        attached: Vec<Sink>,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        config.validate(attached.iter().map(Sink::name))?;

        let metrics = Arc::new(FunnelMetrics::new());
        let (sender, receiver) = transport(&config.transport, Arc::clone(&metrics), on_overflow);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<()>>(1);

        let dispatcher_config = config.dispatcher.clone();
        let dispatcher_metrics = Arc::clone(&metrics);
        let label = config.dispatcher.label.clone();

        let handle = thread::Builder::new()
            .name(label.clone())
            .spawn(move || {
                let dispatcher = match Dispatcher::from_config(&dispatcher_config, attached) {
                    Ok(dispatcher) => dispatcher.with_metrics(dispatcher_metrics),
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return DispatchStats::default();
                    }
                };
                let _ = ready_tx.send(Ok(()));
                dispatcher.run(&receiver)
            })
            .map_err(|e| {
                LoggerError::start_failed(format!("cannot spawn dispatcher thread: {}", e))
            })?;

        match ready_rx.recv_timeout(config.start_timeout) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(LoggerError::start_failed(e.to_string()));
            }
            Err(RecvTimeoutError::Timeout) => {
                // Let the dispatcher stop by itself if it ever comes up
                let _ = sender.send_shutdown();
                return Err(LoggerError::StartTimeout {
                    timeout_ms: config.start_timeout.as_millis() as u64,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                let message = match handle.join() {
                    Err(panic_info) => panic_message(panic_info.as_ref()),
                    Ok(_) => "dispatcher exited before reporting ready".to_string(),
                };
                return Err(LoggerError::start_failed(message));
            }
        }

        Ok(Self {
            sender,
            dispatcher: Some(handle),
            stats: None,
            metrics,
            label,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Run `workload` on a new thread named `name`, bound to this funnel.
    ///
    /// The thread is configured before the workload runs, so both the
    /// `Producer` argument and the logging macros reach the transport.
    pub fn spawn_producer<F, R>(&self, name: impl Into<String>, workload: F) -> Result<ProducerHandle<R>>
    where
        F: FnOnce(&Producer) -> R + Send + 'static,
        R: Send + 'static,
    {
        if !self.is_running() {
            return Err(LoggerError::LoggerStopped);
        }

        let name = name.into();
        let producer = Producer::new(self.sender.clone(), name.clone());
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                configure_with(producer.clone());
                let result = workload(&producer);
                reset();
                result
            })
            .map_err(|e| LoggerError::start_failed(format!("cannot spawn producer '{}': {}", name, e)))?;

        Ok(ProducerHandle { name, handle })
    }

    /// A producer handle for use on a thread this funnel did not spawn
    pub fn producer(&self, label: impl Into<String>) -> Producer {
        Producer::new(self.sender.clone(), label)
    }

    pub fn sender(&self) -> &TransportSender {
        &self.sender
    }

    pub fn metrics(&self) -> &FunnelMetrics {
        &self.metrics
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the dispatcher has not been stopped yet
    pub fn is_running(&self) -> bool {
        self.dispatcher.is_some() && self.stats.is_none()
    }

    /// Join `producers`, send the sentinel, wait for the dispatcher.
    ///
    /// A panicked producer is reported on stderr and does not stop the
    /// shutdown. Calling this again sends nothing and returns the first
    /// call's stats.
    pub fn stop_after<R>(
        &mut self,
        producers: impl IntoIterator<Item = ProducerHandle<R>>,
    ) -> Result<DispatchStats> {
        for producer in producers {
            let name = producer.name.clone();
            if let Err(panic_info) = producer.join() {
                eprintln!(
                    "[LOG-FUNNEL WARNING] Producer '{}' panicked: {}",
                    name,
                    panic_message(panic_info.as_ref())
                );
            }
        }

        if let Some(stats) = &self.stats {
            return Ok(stats.clone());
        }
        let Some(handle) = self.dispatcher.take() else {
            return Err(LoggerError::LoggerStopped);
        };

        if let Err(e) = self.sender.send_shutdown() {
            // Dispatcher already gone; joining below reports why
            eprintln!("[LOG-FUNNEL WARNING] Failed to send shutdown signal: {}", e);
        }

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                return match handle.join() {
                    Ok(stats) => {
                        self.stats = Some(stats.clone());
                        Ok(stats)
                    }
                    Err(panic_info) => Err(LoggerError::DispatcherPanicked {
                        message: panic_message(panic_info.as_ref()),
                    }),
                };
            }

            if start.elapsed() >= self.shutdown_timeout {
                eprintln!(
                    "[LOG-FUNNEL WARNING] Dispatcher did not finish within {:?}. \
                     Some events may be lost.",
                    self.shutdown_timeout
                );
                return Err(LoggerError::StopTimeout {
                    timeout_ms: self.shutdown_timeout.as_millis() as u64,
                });
            }

            // Small sleep to avoid busy-waiting
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Stop with no producers left to join
    pub fn stop(&mut self) -> Result<DispatchStats> {
        self.stop_after(Vec::<ProducerHandle<()>>::new())
    }
}

impl Drop for Funnel {
    fn drop(&mut self) {
        if self.dispatcher.is_none() {
            return;
        }
        if let Err(e) = self.stop() {
            eprintln!("[LOG-FUNNEL ERROR] Failed to stop funnel on drop: {}", e);
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOG-FUNNEL WARNING] Funnel shut down with {} dropped events (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}
