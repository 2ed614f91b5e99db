//! Durable activity log.
//!
//! Every store mutation and item relocation is appended here so a run can
//! be audited after the fact, independently of the process-level tracing
//! output. Lines go to `<component>.<YYYYMMDD>.log` in the configured
//! directory; the writer rolls over to a new file when the calendar day
//! changes between writes.
//!
//! The log is passed to the engine at construction. Tests that do not
//! care about audit output use [`ActivityLog::discard`].

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local, NaiveDate};
use tracing::warn;

/// Severity recorded with each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Routine progress.
    Info,
    /// Something was skipped or cut short.
    Warn,
    /// A failure that was handled and logged rather than propagated.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        })
    }
}

/// Append-only, day-rotated activity log.
#[derive(Debug)]
pub struct ActivityLog {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
enum Inner {
    File(FileLog),
    Discard,
}

#[derive(Debug)]
struct FileLog {
    dir: PathBuf,
    component: String,
    day: NaiveDate,
    writer: LineWriter<File>,
}

impl FileLog {
    fn append(&mut self, now: DateTime<Local>, level: Level, message: &str) -> io::Result<()> {
        let day = now.date_naive();
        if day != self.day {
            let path = self.dir.join(log_file_name(&self.component, day));
            self.writer = LineWriter::new(open_append(&path)?);
            self.day = day;
        }
        writeln!(self.writer, "{} {level} {message}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

impl ActivityLog {
    /// Opens (or appends to) today's log file for `component` under `dir`,
    /// creating the directory as needed.
    ///
    /// Whitespace in `component` is dropped so the name is usable as a
    /// file stem.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or the log file cannot be
    /// created.
    pub fn open(dir: impl AsRef<Path>, component: &str) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let component: String = component.chars().filter(|c| !c.is_whitespace()).collect();
        let day = Local::now().date_naive();
        let writer = LineWriter::new(open_append(&dir.join(log_file_name(&component, day)))?);
        Ok(Self {
            inner: Mutex::new(Inner::File(FileLog { dir, component, day, writer })),
        })
    }

    /// A log that swallows everything. For tests.
    #[must_use]
    pub fn discard() -> Self {
        Self { inner: Mutex::new(Inner::Discard) }
    }

    /// Records routine progress.
    pub fn info(&self, message: &str) {
        self.write(Level::Info, message);
    }

    /// Records a skipped unit or a cut-short run.
    pub fn warn(&self, message: &str) {
        self.write(Level::Warn, message);
    }

    /// Records a handled failure.
    pub fn error(&self, message: &str) {
        self.write(Level::Error, message);
    }

    /// Path of the file the next line would land in, if any.
    #[must_use]
    pub fn current_path(&self) -> Option<PathBuf> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match &*inner {
            Inner::File(file) => Some(file.dir.join(log_file_name(&file.component, file.day))),
            Inner::Discard => None,
        }
    }

    fn write(&self, level: Level, message: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Inner::File(file) = &mut *inner else { return };
        if let Err(error) = file.append(Local::now(), level, message) {
            warn!(%error, "activity log write failed");
        }
    }
}

fn log_file_name(component: &str, day: NaiveDate) -> String {
    format!("{component}.{}.log", day.format("%Y%m%d"))
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
