//! Output sinks: the per-day, per-site summary CSV and the raw-chunk
//! capture file used in monitor mode.
//!
//! The summary file gains a header row on creation; data rows are appended
//! and never rewritten. A same-hour duplicate guard backs up the engine's
//! own flush bookkeeping.

use crate::catalog::PluCatalog;
use crate::engine_core::hourly::HourlyRow;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum WriterError {
    Io(std::io::Error),
}

impl From<std::io::Error> for WriterError {
    fn from(err: std::io::Error) -> Self {
        WriterError::Io(err)
    }
}

impl std::fmt::Display for WriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriterError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for WriterError {}

pub struct RowWriter {
    dir: PathBuf,
    site_id: String,
    file: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    /// (path, hour, written-at) of the last emitted row.
    last_emitted: Option<(PathBuf, u32, Instant)>,
    duplicate_guard: Duration,
}

impl RowWriter {
    pub fn new(dir: impl Into<PathBuf>, site_id: impl Into<String>, duplicate_guard: Duration) -> Self {
        Self {
            dir: dir.into(),
            site_id: site_id.into(),
            file: None,
            current_path: None,
            last_emitted: None,
            duplicate_guard,
        }
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", date.format("%Y%m%d"), self.site_id))
    }

    /// Append one summary row for `date`. Creates the file (and its header
    /// row) on first write of the day; re-emission of the same clock hour
    /// inside the guard window is dropped.
    pub fn write_row(
        &mut self,
        date: NaiveDate,
        row: &HourlyRow,
        catalog: &PluCatalog,
    ) -> Result<(), WriterError> {
        let path = self.path_for(date);
        let hour = row.hour.unwrap_or(0);

        if let Some((last_path, last_hour, at)) = &self.last_emitted {
            if *last_path == path && *last_hour == hour && at.elapsed() < self.duplicate_guard {
                log::warn!(
                    "Dropping duplicate row for hour {:02} of {}",
                    hour,
                    path.display()
                );
                return Ok(());
            }
        }

        if self.current_path.as_ref() != Some(&path) {
            self.close();
        }

        if self.file.is_none() {
            std::fs::create_dir_all(&self.dir)?;
            let existed = path.exists();
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut writer = BufWriter::new(file);
            if !existed {
                writeln!(writer, "{}", HourlyRow::header(catalog).join(","))?;
                log::info!("📝 Created summary file {}", path.display());
            }
            self.file = Some(writer);
            self.current_path = Some(path.clone());
        }

        let writer = self.file.as_mut().expect("writer opened above");
        writeln!(writer, "{}", row.render().join(","))?;
        writer.flush()?;
        self.last_emitted = Some((path, hour, Instant::now()));
        Ok(())
    }

    /// Drop the file handle (idle entry); reopened lazily on the next row.
    pub fn close(&mut self) {
        if let Some(mut writer) = self.file.take() {
            let _ = writer.flush();
        }
        self.current_path = None;
    }
}

impl Drop for RowWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Monitor-mode sink: raw chunks, timestamped, flushed per write.
pub struct RawCaptureWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl RawCaptureWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn capture(&mut self, now: NaiveDateTime, chunk: &str) -> Result<(), WriterError> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.file = Some(BufWriter::new(file));
        }
        let writer = self.file.as_mut().expect("capture file opened above");
        writeln!(writer, "{} {}", now.format("%Y-%m-%d %H:%M:%S"), chunk)?;
        writer.flush()?;
        Ok(())
    }
}
