//! The single consumer: drains the transport and routes events to sinks
//!
//! The dispatcher is the only code that touches a sink. It runs on one
//! thread, so sink writes are serialized without any lock around them.

use super::{
    error::{LoggerError, Result},
    event::{Event, Message},
    metrics::FunnelMetrics,
    route::{Route, RouteTable},
    transport::TransportReceiver,
};
use crate::sinks::{Sink, SinkSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Thread name used for the dispatcher by default
pub const DEFAULT_DISPATCHER_LABEL: &str = "log-dispatcher";

/// Routes and sinks handed to the dispatcher at start
///
/// Sinks are declared in order as `(name, spec)` pairs; routes refer to them
/// by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub routes: Vec<Route>,
    pub sinks: Vec<(String, SinkSpec)>,
    /// Print the producer as `<label> (for <producer>)`
    pub relabel: bool,
    pub label: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            sinks: Vec::new(),
            relabel: false,
            label: DEFAULT_DISPATCHER_LABEL.to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Check names and references without opening anything.
    ///
    /// `extra` names sinks that will be supplied already built.
    pub fn validate<'a>(&'a self, extra: impl IntoIterator<Item = &'a str>) -> Result<()> {
        if self.label.is_empty() {
            return Err(LoggerError::config("dispatcher", "label must not be empty"));
        }

        let mut names: Vec<&str> = self.sinks.iter().map(|(name, _)| name.as_str()).collect();
        names.extend(extra);
        check_unique(names.iter().copied())?;

        RouteTable::new(self.routes.clone()).validate(|name| names.contains(&name))
    }

    /// Open every declared sink, in declaration order
    pub fn open_sinks(&self) -> Result<Vec<Sink>> {
        self.sinks
            .iter()
            .map(|(name, spec)| Sink::open(name.clone(), spec))
            .collect()
    }
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        if seen.contains(&name) {
            return Err(LoggerError::config(
                "dispatcher",
                format!("sink '{}' is declared twice", name),
            ));
        }
        seen.push(name);
    }
    Ok(())
}

/// Running until the sentinel is seen, then Stopped for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Running,
    Stopped,
}

/// What one dispatcher lifetime did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Events taken off the transport
    pub events_received: u64,
    /// Lines written across all sinks
    pub lines_delivered: u64,
    /// Events whose origin matched no route
    pub unrouted: u64,
    /// Individual sink writes that failed or panicked
    pub sink_failures: u64,
}

pub struct Dispatcher {
    routes: RouteTable,
    sinks: Vec<Sink>,
    index: HashMap<String, usize>,
    relabel: Option<String>,
    state: DispatcherState,
    stats: DispatchStats,
    metrics: Arc<FunnelMetrics>,
}

impl Dispatcher {
    /// Build a dispatcher over already opened sinks.
    ///
    /// Fails if two sinks share a name or a route names a sink that isn't here.
    pub fn new(routes: impl Into<RouteTable>, sinks: Vec<Sink>) -> Result<Self> {
        let routes = routes.into();
        check_unique(sinks.iter().map(Sink::name))?;

        let index: HashMap<String, usize> = sinks
            .iter()
            .enumerate()
            .map(|(i, sink)| (sink.name().to_string(), i))
            .collect();
        routes.validate(|name| index.contains_key(name))?;

        Ok(Self {
            routes,
            sinks,
            index,
            relabel: None,
            state: DispatcherState::Running,
            stats: DispatchStats::default(),
            metrics: Arc::new(FunnelMetrics::new()),
        })
    }

    /// Open the configured sinks, add `attached`, and build the dispatcher
    pub fn from_config(config: &DispatcherConfig, attached: Vec<Sink>) -> Result<Self> {
        let mut sinks = config.open_sinks()?;
        sinks.extend(attached);

        let mut dispatcher = Self::new(config.routes.clone(), sinks)?;
        if config.relabel {
            dispatcher.relabel = Some(config.label.clone());
        }
        Ok(dispatcher)
    }

    /// Share counters with the transport
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<FunnelMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Annotate every printed producer label as `<label> (for <producer>)`
    #[must_use]
    pub fn with_relabel(mut self, label: impl Into<String>) -> Self {
        self.relabel = Some(label.into());
        self
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn sink(&self, name: &str) -> Option<&Sink> {
        self.index.get(name).map(|&i| &self.sinks[i])
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Drain `receiver` until the sentinel, then close every sink.
    ///
    /// If every sender disappears without a sentinel the loop also stops;
    /// nothing more can arrive.
    pub fn run(mut self, receiver: &TransportReceiver) -> DispatchStats {
        while self.state == DispatcherState::Running {
            match receiver.receive() {
                Ok(message) => {
                    self.handle(message);
                }
                Err(e) => {
                    eprintln!("[LOG-FUNNEL WARNING] Transport closed without shutdown signal: {}", e);
                    self.shutdown();
                }
            }
        }
        self.stats.clone()
    }

    /// Process one transport item and return the resulting state.
    ///
    /// Anything handled after the stop is ignored; closed sinks are never
    /// reopened.
    pub fn handle(&mut self, message: Message) -> DispatcherState {
        if self.state == DispatcherState::Stopped {
            return self.state;
        }

        match message {
            Message::Event(event) => {
                self.dispatch(&event);
            }
            Message::Shutdown => self.shutdown(),
        }
        self.state
    }

    /// Route one event and write it to every matching sink.
    ///
    /// Returns how many sinks wrote a line.
    pub fn dispatch(&mut self, event: &Event) -> usize {
        self.stats.events_received += 1;
        self.metrics.record_received();

        let Some(route) = self.routes.resolve(event.origin()) else {
            self.stats.unrouted += 1;
            self.metrics.record_unrouted();
            return 0;
        };
        if !route.accepts(event.severity()) {
            return 0;
        }

        let display_label = match &self.relabel {
            Some(label) => format!("{} (for {})", label, event.producer_label()),
            None => event.producer_label().to_string(),
        };

        let mut delivered = 0;
        for name in &route.sinks {
            let Some(&idx) = self.index.get(name) else {
                continue;
            };
            let sink = &mut self.sinks[idx];
            let result = catch_unwind(AssertUnwindSafe(|| sink.accept(event, &display_label)));

            match result {
                Ok(Ok(true)) => {
                    delivered += 1;
                    self.stats.lines_delivered += 1;
                    self.metrics.record_delivered();
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOG-FUNNEL ERROR] Sink '{}' failed: {}", name, e);
                    self.stats.sink_failures += 1;
                    self.metrics.record_sink_failure();
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOG-FUNNEL ERROR] Sink '{}' panicked: {}. \
                         Other sinks continue to function.",
                        name,
                        panic_message(panic_info.as_ref())
                    );
                    self.stats.sink_failures += 1;
                    self.metrics.record_sink_failure();
                }
            }
        }
        delivered
    }

    /// Flush and close every sink once, then stop
    pub fn shutdown(&mut self) {
        if self.state == DispatcherState::Stopped {
            return;
        }
        self.state = DispatcherState::Stopped;

        for sink in &mut self.sinks {
            let result = catch_unwind(AssertUnwindSafe(|| {
                sink.flush()?;
                sink.close()
            }));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOG-FUNNEL ERROR] Sink '{}' close failed: {}", sink.name(), e)
                }
                Err(panic_info) => eprintln!(
                    "[LOG-FUNNEL ERROR] Sink '{}' panicked during close: {}",
                    sink.name(),
                    panic_message(panic_info.as_ref())
                ),
            }
        }
    }
}

pub(crate) fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
