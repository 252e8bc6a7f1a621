//! Console sink implementation

use crate::core::{Result, Severity};
#[cfg(feature = "console")]
use colored::Colorize;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::Arc;

/// Which standard stream a console sink writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleStream {
    Stdout,
    #[default]
    Stderr,
    /// Error and Critical to stderr, everything else to stdout
    Split,
}

enum ConsoleWriter {
    Stream(ConsoleStream),
    Custom(Box<dyn Write + Send>),
}

pub struct ConsoleSink {
    writer: ConsoleWriter,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new(stream: ConsoleStream) -> Self {
        Self {
            writer: ConsoleWriter::Stream(stream),
            use_colors: false,
        }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleStream::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleStream::Stderr)
    }

    /// Write to any `Write` instead of a standard stream.
    ///
    /// # Example
    ///
    /// ```
    /// use log_funnel::sinks::{ConsoleSink, SharedBuffer};
    ///
    /// let buffer = SharedBuffer::new();
    /// let sink = ConsoleSink::with_writer(buffer.clone());
    /// ```
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: ConsoleWriter::Custom(Box::new(writer)),
            use_colors: false,
        }
    }

    /// Color the whole line by severity. Ignored without the `console` feature.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub(crate) fn write_line(&mut self, line: &str, severity: Severity) -> Result<()> {
        let line = self.decorate(line, severity);

        match &mut self.writer {
            ConsoleWriter::Stream(ConsoleStream::Stdout) => {
                writeln!(io::stdout().lock(), "{}", line)?;
            }
            ConsoleWriter::Stream(ConsoleStream::Stderr) => {
                writeln!(io::stderr().lock(), "{}", line)?;
            }
            ConsoleWriter::Stream(ConsoleStream::Split) => match severity {
                Severity::Error | Severity::Critical => writeln!(io::stderr().lock(), "{}", line)?,
                _ => writeln!(io::stdout().lock(), "{}", line)?,
            },
            ConsoleWriter::Custom(writer) => writeln!(writer, "{}", line)?,
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        match &mut self.writer {
            ConsoleWriter::Stream(_) => {
                // Flush both since Split writes to both
                io::stdout().flush()?;
                io::stderr().flush()?;
            }
            ConsoleWriter::Custom(writer) => writer.flush()?,
        }
        Ok(())
    }

    #[cfg(feature = "console")]
    fn decorate(&self, line: &str, severity: Severity) -> String {
        if self.use_colors {
            line.color(severity.color_code()).to_string()
        } else {
            line.to_string()
        }
    }

    #[cfg(not(feature = "console"))]
    fn decorate(&self, line: &str, _severity: Severity) -> String {
        line.to_string()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stderr()
    }
}

/// In-memory, clonable `Write` target for capturing console output
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_writer_receives_lines() {
        let buffer = SharedBuffer::new();
        let mut sink = ConsoleSink::with_writer(buffer.clone());

        sink.write_line("first", Severity::Info).unwrap();
        sink.write_line("second", Severity::Error).unwrap();
        sink.flush().unwrap();

        assert_eq!(buffer.lines(), vec!["first", "second"]);
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colors_only_when_enabled() {
        colored::control::set_override(true);
        let plain = SharedBuffer::new();
        let colored_buf = SharedBuffer::new();

        ConsoleSink::with_writer(plain.clone())
            .write_line("msg", Severity::Error)
            .unwrap();
        ConsoleSink::with_writer(colored_buf.clone())
            .with_colors(true)
            .write_line("msg", Severity::Error)
            .unwrap();

        assert_eq!(plain.contents(), "msg\n");
        assert!(colored_buf.contents().contains("\u{1b}["));
    }

    #[test]
    fn test_default_stream_is_stderr() {
        assert_eq!(ConsoleStream::default(), ConsoleStream::Stderr);
    }
}
