//! Journal handle
//!
//! [`Journal`] is a cheap, cloneable handle. Logging calls are synchronous:
//! they format the line, echo it through `tracing`, and queue it for the
//! writer task. Only reads ([`Journal::tail`]) and [`Journal::flush`] wait
//! for the writer.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Local};
use pvmirror_core::ports::mirror_transfer::{ITransferOutput, OutputStream};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{error, info, warn};

use crate::{
    session::{format_line, LogLevel, LogSession},
    writer::{open_append, JournalCommand, JournalWriter},
    JournalError,
};

/// Handle to the append-only daily log.
#[derive(Debug, Clone)]
pub struct Journal {
    tx: mpsc::UnboundedSender<JournalCommand>,
    directory: Arc<PathBuf>,
}

impl Journal {
    /// Opens the journal rooted at `directory` and spawns its writer task.
    ///
    /// Creates the directory if it is absent and checks that today's session
    /// can be opened for appending, so an unwritable log location fails at
    /// startup rather than on the first line.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn open(
        directory: impl Into<PathBuf>,
    ) -> Result<(Self, JoinHandle<()>), JournalError> {
        let directory = directory.into();

        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|source| JournalError::CreateDirectory {
                path: directory.clone(),
                source,
            })?;

        let today = LogSession::at(&directory, &Local::now());
        drop(open_append(today.path()).await?);

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = JournalWriter::new(directory.clone());
        let handle = tokio::spawn(writer.run(rx));

        Ok((
            Self {
                tx,
                directory: Arc::new(directory),
            },
            handle,
        ))
    }

    /// Directory holding the session files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The session a line logged right now would land in.
    pub fn current_session(&self) -> LogSession {
        LogSession::at(&self.directory, &Local::now())
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message.as_ref());
    }

    /// Logs `message` with the current wall-clock time.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.log_at(Local::now(), level, message);
    }

    /// Logs `message` as if written at `at`.
    ///
    /// The session is resolved from `at` for every line.
    pub fn log_at(&self, at: DateTime<Local>, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => info!("{message}"),
            LogLevel::Warn => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }

        let line = format_line(&at, level, message);
        // A stopped writer only happens during shutdown; the console copy above survives.
        let _ = self.tx.send(JournalCommand::Append { at, line });
    }

    /// Last `lines` lines of the current session, including every line
    /// logged before this call.
    pub async fn tail(&self, lines: usize) -> Result<Vec<String>, JournalError> {
        self.tail_at(Local::now(), lines).await
    }

    /// Last `lines` lines of the session `at` belongs to.
    pub async fn tail_at(
        &self,
        at: DateTime<Local>,
        lines: usize,
    ) -> Result<Vec<String>, JournalError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(JournalCommand::Tail { at, lines, reply })
            .map_err(|_| JournalError::Closed)?;
        rx.await.map_err(|_| JournalError::Closed)?
    }

    /// Waits until every line queued so far has been written.
    pub async fn flush(&self) -> Result<(), JournalError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(JournalCommand::Flush { reply })
            .map_err(|_| JournalError::Closed)?;
        rx.await.map_err(|_| JournalError::Closed)
    }
}

/// Transfer output goes straight into the journal: stdout at INFO,
/// stderr at ERROR, each line with its own timestamp.
impl ITransferOutput for Journal {
    fn line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => self.info(line),
            OutputStream::Stderr => self.error(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, m, d, h, min, s)
            .single()
            .expect("unambiguous local time")
    }

    #[tokio::test]
    async fn open_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("logs");

        let (journal, _writer) = Journal::open(&dir).await.unwrap();
        assert!(dir.is_dir());
        assert!(journal.current_session().path().exists());
    }

    #[tokio::test]
    async fn open_fails_when_directory_cannot_be_created() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = Journal::open(blocker.join("logs")).await.unwrap_err();
        assert!(matches!(err, JournalError::CreateDirectory { .. }));
    }

    #[tokio::test]
    async fn lines_are_timestamped_and_levelled() {
        let root = tempfile::tempdir().unwrap();
        let (journal, _writer) = Journal::open(root.path()).await.unwrap();
        let at = local(2026, 5, 1, 12, 30, 0);

        journal.log_at(at, LogLevel::Info, "starting");
        journal.log_at(at, LogLevel::Error, "failed");
        journal.flush().await.unwrap();

        let content =
            std::fs::read_to_string(LogSession::at(root.path(), &at).path()).unwrap();
        assert_eq!(
            content,
            "2026-05-01 12:30:00 [INFO]: starting\n2026-05-01 12:30:00 [ERROR]: failed\n"
        );
    }

    #[tokio::test]
    async fn date_boundary_splits_sessions() {
        let root = tempfile::tempdir().unwrap();
        let (journal, _writer) = Journal::open(root.path()).await.unwrap();
        let before = local(2026, 5, 1, 23, 59, 59);
        let after = local(2026, 5, 2, 0, 0, 1);

        journal.log_at(before, LogLevel::Info, "last of the day");
        journal.log_at(after, LogLevel::Info, "first of the day");
        journal.flush().await.unwrap();

        let first = std::fs::read_to_string(LogSession::at(root.path(), &before).path()).unwrap();
        let second = std::fs::read_to_string(LogSession::at(root.path(), &after).path()).unwrap();
        assert_eq!(first.lines().count(), 1);
        assert!(first.contains("last of the day"));
        assert_eq!(second.lines().count(), 1);
        assert!(second.contains("first of the day"));
    }

    #[tokio::test]
    async fn tail_sees_every_line_queued_before_it() {
        let root = tempfile::tempdir().unwrap();
        let (journal, _writer) = Journal::open(root.path()).await.unwrap();
        let at = local(2026, 5, 1, 8, 0, 0);

        for i in 1..=15 {
            journal.log_at(at, LogLevel::Info, &format!("line {i}"));
        }
        // No flush: ordering on the writer queue is enough.
        let tail = journal.tail_at(at, 10).await.unwrap();

        assert_eq!(tail.len(), 10);
        assert!(tail[0].ends_with("line 6"));
        assert!(tail[9].ends_with("line 15"));
    }

    #[tokio::test]
    async fn tail_of_a_quiet_day_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let (journal, _writer) = Journal::open(root.path()).await.unwrap();

        let tail = journal
            .tail_at(local(2020, 1, 1, 12, 0, 0), 10)
            .await
            .unwrap();
        assert!(tail.is_empty());
    }

    #[tokio::test]
    async fn transfer_output_maps_streams_to_levels() {
        let root = tempfile::tempdir().unwrap();
        let (journal, _writer) = Journal::open(root.path()).await.unwrap();

        journal.line(OutputStream::Stdout, "sending incremental file list");
        journal.line(OutputStream::Stderr, "rsync: connection unexpectedly closed");

        let tail = journal.tail(2).await.unwrap();
        assert!(tail[0].contains("[INFO]: sending incremental file list"));
        assert!(tail[1].contains("[ERROR]: rsync: connection unexpectedly closed"));
    }

    #[tokio::test]
    async fn writer_stops_when_all_handles_drop() {
        let root = tempfile::tempdir().unwrap();
        let (journal, writer) = Journal::open(root.path()).await.unwrap();
        let clone = journal.clone();

        drop(journal);
        drop(clone);

        tokio::time::timeout(std::time::Duration::from_secs(5), writer)
            .await
            .expect("writer should stop")
            .unwrap();
    }
}
