//! Log sessions and line formatting
//!
//! A session is one calendar day of log output. Its identity is derived
//! from the date alone, so rotation happens implicitly the first time a
//! line is written after midnight. Old sessions are never removed here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};

/// File name prefix shared by every session.
const SESSION_PREFIX: &str = "pvmirror-";

/// Timestamp prefix of every log line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity of a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// One day's log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSession {
    date: NaiveDate,
    path: PathBuf,
}

impl LogSession {
    /// Resolves the session for `date` inside `directory`.
    pub fn for_date(directory: &Path, date: NaiveDate) -> Self {
        let file_name = format!("{SESSION_PREFIX}{}.log", date.format("%Y-%m-%d"));
        Self {
            date,
            path: directory.join(file_name),
        }
    }

    /// Resolves the session a line written at `at` belongs to.
    pub fn at(directory: &Path, at: &DateTime<Local>) -> Self {
        Self::for_date(directory, at.date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Formats a line as `<timestamp> [<LEVEL>]: <message>`.
pub fn format_line(at: &DateTime<Local>, level: LogLevel, message: &str) -> String {
    format!("{} [{}]: {}", at.format(TIMESTAMP_FORMAT), level, message)
}
