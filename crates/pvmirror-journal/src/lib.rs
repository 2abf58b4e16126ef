//! pvmirror Journal - Durable daily logs and operator alerts
//!
//! Provides:
//! - `LogSession`: the per-day log file, a pure function of the date
//! - `Journal`: cloneable handle feeding a single writer task
//! - `Notifier`: journal logging plus fire-and-forget alerts
//!
//! Every append, tail read and flush goes through one queue, so a signal
//! reporter reading the last lines never observes a half-written line.

pub mod journal;
pub mod notifier;
pub mod session;
mod writer;

use std::path::PathBuf;

use thiserror::Error;

pub use journal::Journal;
pub use notifier::Notifier;
pub use session::{LogLevel, LogSession};

/// Errors raised by the journal
#[derive(Debug, Error)]
pub enum JournalError {
    /// The log directory could not be created
    #[error("Cannot create log directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The current session file cannot be opened for appending
    #[error("Log session {} is not writable: {source}", .path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A session file could not be read back
    #[error("Cannot read log session {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The writer task is gone
    #[error("Journal writer has stopped")]
    Closed,
}
