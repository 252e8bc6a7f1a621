//! Output sinks
//!
//! A sink owns exactly one output resource and is only ever touched by the
//! dispatcher thread. The set of targets is closed ([`SinkTarget`]); the
//! per-sink threshold and line layout live on the [`Sink`] wrapper so every
//! target is driven the same way: format, then write one line.

pub mod console;
pub mod file;
pub mod rotating_file;

pub use console::{ConsoleSink, ConsoleStream, SharedBuffer};
pub use file::{FileMode, FileSink};
pub use rotating_file::{RotatingFileSink, RotationPolicy, RotationStrategy};

use crate::core::{Event, LineFormat, LoggerError, Result, Severity, TimestampFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The closed set of output targets
pub enum SinkTarget {
    Console(ConsoleSink),
    File(FileSink),
    RotatingFile(RotatingFileSink),
}

impl SinkTarget {
    fn write_line(&mut self, line: &str, severity: Severity) -> Result<()> {
        match self {
            SinkTarget::Console(sink) => sink.write_line(line, severity),
            SinkTarget::File(sink) => sink.write_line(line),
            SinkTarget::RotatingFile(sink) => sink.write_line(line),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            SinkTarget::Console(sink) => sink.flush(),
            SinkTarget::File(sink) => sink.flush(),
            SinkTarget::RotatingFile(sink) => sink.flush(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            SinkTarget::Console(sink) => sink.flush(),
            SinkTarget::File(sink) => sink.close(),
            SinkTarget::RotatingFile(sink) => sink.close(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SinkTarget::Console(_) => "console",
            SinkTarget::File(_) => "file",
            SinkTarget::RotatingFile(_) => "rotating_file",
        }
    }
}

impl From<ConsoleSink> for SinkTarget {
    fn from(sink: ConsoleSink) -> Self {
        SinkTarget::Console(sink)
    }
}

impl From<FileSink> for SinkTarget {
    fn from(sink: FileSink) -> Self {
        SinkTarget::File(sink)
    }
}

impl From<RotatingFileSink> for SinkTarget {
    fn from(sink: RotatingFileSink) -> Self {
        SinkTarget::RotatingFile(sink)
    }
}

/// A named target plus its threshold and line layout
///
/// # Example
///
/// ```
/// use log_funnel::sinks::{ConsoleSink, SharedBuffer, Sink};
/// use log_funnel::{LineFormat, Severity};
///
/// let buffer = SharedBuffer::new();
/// let sink = Sink::new("console", ConsoleSink::with_writer(buffer.clone()))
///     .with_min_severity(Severity::Info)
///     .with_format(LineFormat::Simple);
/// assert!(sink.accepts(Severity::Warning));
/// assert!(!sink.accepts(Severity::Debug));
/// ```
pub struct Sink {
    name: String,
    min_severity: Severity,
    format: LineFormat,
    timestamp_format: TimestampFormat,
    target: SinkTarget,
    closed: bool,
}

impl Sink {
    pub fn new(name: impl Into<String>, target: impl Into<SinkTarget>) -> Self {
        Self {
            name: name.into(),
            min_severity: Severity::Trace,
            format: LineFormat::default(),
            timestamp_format: TimestampFormat::default(),
            target: target.into(),
            closed: false,
        }
    }

    /// Open the resource described by `spec`
    pub fn open(name: impl Into<String>, spec: &SinkSpec) -> Result<Self> {
        let target: SinkTarget = match &spec.kind {
            SinkKind::Console { stream, colors } => {
                ConsoleSink::new(*stream).with_colors(*colors).into()
            }
            SinkKind::File { path, mode } => FileSink::open(path, *mode)?.into(),
            SinkKind::RotatingFile { path, rotation } => {
                RotatingFileSink::with_policy(path, rotation.clone())?.into()
            }
        };

        Ok(Self::new(name, target)
            .with_min_severity(spec.min_severity)
            .with_format(spec.format.clone())
            .with_timestamp_format(spec.timestamp_format.clone()))
    }

    #[must_use]
    pub fn with_min_severity(mut self, level: Severity) -> Self {
        self.min_severity = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.target.kind()
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn accepts(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    /// Format and write `event` if it meets this sink's threshold.
    ///
    /// Returns `Ok(false)` when filtered out. `display_label` is the producer
    /// label to print.
    pub fn accept(&mut self, event: &Event, display_label: &str) -> Result<bool> {
        if !self.accepts(event.severity()) {
            return Ok(false);
        }
        if self.closed {
            return Err(LoggerError::sink_closed(&self.name));
        }

        let line = self
            .format
            .format(event, display_label, &self.timestamp_format);
        self.target
            .write_line(&line, event.severity())
            .map_err(|e| LoggerError::sink_write(&self.name, e.to_string()))?;
        Ok(true)
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.target.flush()
    }

    /// Flush and release the resource. Only the first call does anything.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.target.close()
    }
}

/// Declarative sink description, as found in configuration files
///
/// ```
/// use log_funnel::sinks::SinkSpec;
///
/// let spec: SinkSpec = serde_json::from_str(
///     r#"{"kind":"file","path":"logs/error.log","mode":"truncate","min_severity":"ERROR"}"#,
/// ).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkSpec {
    #[serde(flatten)]
    pub kind: SinkKind,
    #[serde(default = "lowest_severity")]
    pub min_severity: Severity,
    #[serde(default)]
    pub format: LineFormat,
    #[serde(default)]
    pub timestamp_format: TimestampFormat,
}

fn lowest_severity() -> Severity {
    Severity::Trace
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkKind {
    Console {
        #[serde(default)]
        stream: ConsoleStream,
        #[serde(default)]
        colors: bool,
    },
    File {
        path: PathBuf,
        #[serde(default)]
        mode: FileMode,
    },
    RotatingFile {
        path: PathBuf,
        #[serde(default)]
        rotation: RotationPolicy,
    },
}

impl SinkSpec {
    pub fn new(kind: SinkKind) -> Self {
        Self {
            kind,
            min_severity: Severity::Trace,
            format: LineFormat::default(),
            timestamp_format: TimestampFormat::default(),
        }
    }

    pub fn console(stream: ConsoleStream) -> Self {
        Self::new(SinkKind::Console {
            stream,
            colors: false,
        })
    }

    pub fn file(path: impl Into<PathBuf>, mode: FileMode) -> Self {
        Self::new(SinkKind::File {
            path: path.into(),
            mode,
        })
    }

    pub fn rotating_file(path: impl Into<PathBuf>, rotation: RotationPolicy) -> Self {
        Self::new(SinkKind::RotatingFile {
            path: path.into(),
            rotation,
        })
    }

    #[must_use]
    pub fn with_min_severity(mut self, level: Severity) -> Self {
        self.min_severity = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }
}
