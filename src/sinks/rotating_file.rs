//! Rotating file sink
//!
//! Time-based strategies compute the next rollover instant up front and
//! rotate before writing the first line at or past it. The line that crosses
//! the boundary goes to the fresh file, so every line lands in exactly one
//! file.

use super::file::{open_locked, FileMode};
use crate::core::{LoggerError, Result};
use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// When to rotate
///
/// # Examples
///
/// ```
/// use log_funnel::sinks::RotationStrategy;
/// use std::time::Duration;
///
/// // Rotate at midnight
/// let midnight = RotationStrategy::daily(0);
///
/// // Rotate when the file would exceed 10 MB
/// let size = RotationStrategy::Size { max_bytes: 10 * 1024 * 1024 };
///
/// // Rotate every 15 minutes
/// let every = RotationStrategy::Interval { interval: Duration::from_secs(900) };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RotationStrategy {
    /// Rotate daily at the given local hour (0-23); hour 0 is midnight
    Daily { hour: u8 },

    /// Rotate at the top of every hour
    Hourly,

    /// Rotate a fixed interval after the previous rotation
    Interval {
        #[serde(with = "humantime_serde")]
        interval: Duration,
    },

    /// Rotate before a write would push the file past `max_bytes`
    Size { max_bytes: u64 },

    /// No rotation (useful when external rotation is used)
    Never,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        RotationStrategy::Daily { hour: 0 }
    }
}

impl RotationStrategy {
    /// Create a daily rotation strategy
    ///
    /// # Panics
    ///
    /// Panics if hour is greater than 23
    #[must_use]
    pub fn daily(hour: u8) -> Self {
        assert!(hour <= 23, "Hour must be between 0 and 23");
        RotationStrategy::Daily { hour }
    }

    fn validate(&self) -> Result<()> {
        match self {
            RotationStrategy::Daily { hour } if *hour > 23 => Err(LoggerError::config(
                "rotation",
                format!("daily hour must be between 0 and 23, got {}", hour),
            )),
            RotationStrategy::Interval { interval } if interval.is_zero() => Err(
                LoggerError::config("rotation", "interval must be greater than zero"),
            ),
            RotationStrategy::Size { max_bytes: 0 } => Err(LoggerError::config(
                "rotation",
                "max_bytes must be greater than zero",
            )),
            _ => Ok(()),
        }
    }

    /// First rollover instant strictly after `after`, for time-based strategies
    fn next_rollover(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            RotationStrategy::Daily { hour } => {
                let at = NaiveTime::from_hms_opt(u32::from(*hour), 0, 0)?;
                let today = after.date_naive().and_time(at);
                let candidate = local_at(today);
                if candidate > after {
                    Some(candidate)
                } else {
                    Some(local_at(today + chrono::Duration::days(1)))
                }
            }
            RotationStrategy::Hourly => {
                let top = after
                    .date_naive()
                    .and_time(NaiveTime::from_hms_opt(after.hour(), 0, 0)?);
                Some(local_at(top + chrono::Duration::hours(1)))
            }
            RotationStrategy::Interval { interval } => {
                Some(after + chrono::Duration::from_std(*interval).ok()?)
            }
            RotationStrategy::Size { .. } | RotationStrategy::Never => None,
        }
    }
}

/// Resolve a local wall-clock time, skipping forward over DST gaps
fn local_at(naive: NaiveDateTime) -> DateTime<Local> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Configuration for the rotating file sink
///
/// ```
/// use log_funnel::sinks::{RotationPolicy, RotationStrategy};
///
/// let policy = RotationPolicy::new()
///     .with_strategy(RotationStrategy::daily(0))
///     .with_max_backups(7)
///     .with_compression(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    pub strategy: RotationStrategy,
    /// Maximum number of rotated files to keep
    pub max_backups: usize,
    /// Gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::default(),
            max_backups: 5,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_strategy(mut self, strategy: RotationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

pub struct RotatingFileSink {
    base_path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Next time-based rollover instant, if the strategy is time-based
    rollover_at: Option<DateTime<Local>>,
    /// Set once `close` has run; rotation never reopens a closed sink
    closed: bool,
}

impl RotatingFileSink {
    /// Rotate at midnight, keep five backups
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        policy.strategy.validate()?;
        let base_path = path.as_ref().to_path_buf();
        let file = open_locked(&base_path, FileMode::Append)?;

        let metadata = file.metadata().map_err(|e| {
            LoggerError::io_operation(
                "read log file metadata",
                format!("Cannot access metadata of '{}'", base_path.display()),
                e,
            )
        })?;

        // Measure from the last write so a file left over from yesterday
        // rotates on the first write today
        let last_written: DateTime<Local> = metadata
            .modified()
            .unwrap_or_else(|_| SystemTime::now())
            .into();

        Ok(Self {
            rollover_at: policy.strategy.next_rollover(last_written),
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size: metadata.len(),
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn rollover_at(&self) -> Option<DateTime<Local>> {
        self.rollover_at
    }

    pub(crate) fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_line_at(line, Local::now())
    }

    /// Write one line as if the wall clock read `now`.
    ///
    /// Rotation decisions are taken against `now`; `write_line` passes the
    /// current time.
    pub fn write_line_at(&mut self, line: &str, now: DateTime<Local>) -> Result<()> {
        if self.closed {
            return Err(LoggerError::sink_closed(self.base_path.display().to_string()));
        }

        let line_len = line.len() as u64 + 1;
        if self.should_rotate(line_len, now) {
            if let Err(e) = self.rotate(now) {
                eprintln!(
                    "[LOG-FUNNEL WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                if self.writer.is_none() {
                    self.reopen().map_err(|reopen_err| {
                        eprintln!(
                            "[LOG-FUNNEL ERROR] Failed to reopen log file after rotation failure: {}",
                            reopen_err
                        );
                        e
                    })?;
                }
                // Push the boundary forward so a persistent failure doesn't retry on every line.
                // The size is left alone: it still describes the file being written.
                self.rollover_at = self.policy.strategy.next_rollover(now);
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::sink_closed(self.base_path.display().to_string()))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        self.current_size += line_len;
        Ok(())
    }

    fn should_rotate(&self, incoming: u64, now: DateTime<Local>) -> bool {
        match &self.policy.strategy {
            RotationStrategy::Never => false,
            // A single oversized line into an empty file is written as is
            RotationStrategy::Size { max_bytes } => {
                self.current_size > 0 && self.current_size + incoming > *max_bytes
            }
            _ => self.rollover_at.is_some_and(|at| now >= at),
        }
    }

    fn rotate(&mut self, now: DateTime<Local>) -> Result<()> {
        // Flush and release the current handle before renaming
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        if self.policy.max_backups == 0 {
            // No backups kept: start the file over
            let file = open_locked(&self.base_path, FileMode::Truncate)?;
            return self.install(file, now);
        }

        // Drop the oldest backup, then shift the rest up by one
        for oldest in self.backup_candidates(self.policy.max_backups) {
            if oldest.exists() {
                if let Err(e) = fs::remove_file(&oldest) {
                    eprintln!(
                        "[LOG-FUNNEL WARNING] Failed to remove oldest backup {}: {}",
                        oldest.display(),
                        e
                    );
                }
            }
        }

        for i in (1..self.policy.max_backups).rev() {
            for (from, to) in self
                .backup_candidates(i)
                .into_iter()
                .zip(self.backup_candidates(i + 1))
            {
                if from.exists() {
                    fs::rename(&from, &to).map_err(|e| {
                        LoggerError::file_rotation(
                            from.display().to_string(),
                            format!("Failed to shift backup: {}", e),
                        )
                    })?;
                }
            }
        }

        let backup = self.backup_path(1);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &backup).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;

            if self.policy.compress {
                self.compress_file(&backup)?;
            }
        }

        let file = open_locked(&self.base_path, FileMode::Append)?;
        self.install(file, now)
    }

    fn install(&mut self, file: File, now: DateTime<Local>) -> Result<()> {
        self.writer = Some(BufWriter::new(file));
        self.current_size = 0;
        self.rollover_at = self.policy.strategy.next_rollover(now);
        Ok(())
    }

    fn reopen(&mut self) -> Result<()> {
        let file = open_locked(&self.base_path, FileMode::Append)?;
        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// `app.log` -> `app.log.<index>`
    fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log")
            .to_string();
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }

    fn gz_path(path: &Path) -> PathBuf {
        let mut gz = path.as_os_str().to_owned();
        gz.push(".gz");
        PathBuf::from(gz)
    }

    /// Plain and compressed names of the backup at `index`
    fn backup_candidates(&self, index: usize) -> [PathBuf; 2] {
        let plain = self.backup_path(index);
        let compressed = Self::gz_path(&plain);
        [plain, compressed]
    }

    /// Gzip `path` into `path.gz`, deleting the original only after success
    fn compress_file(&self, path: &Path) -> Result<()> {
        use flate2::{write::GzEncoder, Compression};
        use std::io::BufReader;

        let gz_path = Self::gz_path(path);
        let mut temp_path = gz_path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        let result = (|| -> std::io::Result<()> {
            let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
            let output = BufWriter::with_capacity(64 * 1024, File::create(&temp_path)?);
            let mut encoder = GzEncoder::new(output, Compression::default());
            std::io::copy(&mut reader, &mut encoder)?;
            encoder.finish()?.flush()?;
            fs::rename(&temp_path, &gz_path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(LoggerError::io_operation(
                "compress log file",
                format!("Failed to compress '{}'", path.display()),
                e,
            ));
        }

        if let Err(e) = fs::remove_file(path) {
            eprintln!(
                "[LOG-FUNNEL WARNING] Compressed {} but failed to remove the original: {}",
                path.display(),
                e
            );
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::io_operation(
                    "flush log file",
                    format!("Failed to flush '{}'", self.base_path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.closed = true;
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
