//! File sink implementation

use crate::core::{LoggerError, Result};
#[cfg(feature = "file")]
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How an existing file is treated when the sink opens it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    #[default]
    Append,
    /// Start from an empty file on every open
    Truncate,
}

/// Open `path` for writing, creating parent directories, and take an
/// exclusive advisory lock so no second writer can share it.
pub(crate) fn open_locked(path: &Path, mode: FileMode) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        FileMode::Append => options.append(true),
        // Truncate only after the lock is held, so a locked file is never clobbered
        FileMode::Truncate => options.write(true),
    };

    let file = options.open(path).map_err(|e| {
        LoggerError::io_operation(
            "open log file",
            format!("Failed to open '{}'", path.display()),
            e,
        )
    })?;

    #[cfg(feature = "file")]
    file.try_lock_exclusive()
        .map_err(|_| LoggerError::file_lock(path.display().to_string()))?;

    if mode == FileMode::Truncate {
        file.set_len(0)?;
    }

    Ok(file)
}

pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn open(path: impl Into<PathBuf>, mode: FileMode) -> Result<Self> {
        let path = path.into();
        let file = open_locked(&path, mode)?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Open in append mode
    pub fn append(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(path, FileMode::Append)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::sink_closed(self.path.display().to_string()))?;

        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flush and release the file handle (and its lock)
    pub(crate) fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_mode_keeps_existing_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "old\n").unwrap();

        let mut sink = FileSink::append(&path).unwrap();
        sink.write_line("new").unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_truncate_mode_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "old\n").unwrap();

        let mut sink = FileSink::open(&path, FileMode::Truncate).unwrap();
        sink.write_line("new").unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/logs/debug.log");

        let mut sink = FileSink::append(&path).unwrap();
        sink.write_line("x").unwrap();
        sink.flush().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::append(dir.path().join("a.log")).unwrap();
        sink.close().unwrap();

        assert!(matches!(
            sink.write_line("late"),
            Err(LoggerError::SinkClosed { .. })
        ));
        sink.close().unwrap();
    }

    #[cfg(all(feature = "file", unix))]
    #[test]
    fn test_second_writer_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("single.log");

        let first = FileSink::append(&path).unwrap();
        let second = FileSink::append(&path);
        assert!(matches!(second, Err(LoggerError::FileLockError { .. })));

        drop(first);
        assert!(FileSink::append(&path).is_ok());
    }
}
