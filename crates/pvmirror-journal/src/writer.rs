//! The single journal writer task
//!
//! Owns the only open session file. Commands are handled strictly in the
//! order they were queued, which is what makes a tail read consistent with
//! every append queued before it.

use std::{
    io::{ErrorKind, SeekFrom},
    path::PathBuf,
};

use chrono::{DateTime, Local};
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
    sync::{mpsc, oneshot},
};
use tracing::{debug, warn};

use crate::{session::LogSession, JournalError};

/// Requests accepted by the writer task.
#[derive(Debug)]
pub(crate) enum JournalCommand {
    /// Append an already formatted line to the session of `at`.
    Append { at: DateTime<Local>, line: String },
    /// Read the last `lines` lines of the session of `at`.
    Tail {
        at: DateTime<Local>,
        lines: usize,
        reply: oneshot::Sender<Result<Vec<String>, JournalError>>,
    },
    /// Reply once everything queued before has reached the file.
    Flush { reply: oneshot::Sender<()> },
}

pub(crate) struct JournalWriter {
    directory: PathBuf,
    current: Option<(LogSession, File)>,
}

impl JournalWriter {
    pub(crate) fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            current: None,
        }
    }

    /// Processes commands until every [`Journal`](crate::Journal) handle is dropped.
    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<JournalCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                JournalCommand::Append { at, line } => {
                    if let Err(e) = self.append(&at, &line).await {
                        warn!(error = %e, "Failed to append journal line");
                    }
                }
                JournalCommand::Tail { at, lines, reply } => {
                    let result = self.tail(&at, lines).await;
                    let _ = reply.send(result);
                }
                JournalCommand::Flush { reply } => {
                    if let Some((_, file)) = self.current.as_mut() {
                        if let Err(e) = file.flush().await {
                            warn!(error = %e, "Failed to flush journal");
                        }
                    }
                    let _ = reply.send(());
                }
            }
        }

        if let Some((session, mut file)) = self.current.take() {
            let _ = file.flush().await;
            debug!(path = %session.path().display(), "Journal writer stopped");
        }
    }

    async fn append(&mut self, at: &DateTime<Local>, line: &str) -> Result<(), JournalError> {
        let session = LogSession::at(&self.directory, at);

        let stale = match &self.current {
            Some((open, _)) => *open != session,
            None => true,
        };
        if stale {
            let file = open_append(session.path()).await?;
            debug!(path = %session.path().display(), "Opened log session");
            self.current = Some((session, file));
        }

        let Some((session, file)) = self.current.as_mut() else {
            return Ok(());
        };

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let result = async {
            file.write_all(buf.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(source) = result {
            let path = session.path().to_path_buf();
            // Reopen on the next line rather than keep writing to a broken handle.
            self.current = None;
            return Err(JournalError::Unwritable { path, source });
        }
        Ok(())
    }

    async fn tail(&self, at: &DateTime<Local>, lines: usize) -> Result<Vec<String>, JournalError> {
        let session = LogSession::at(&self.directory, at);
        read_tail(session.path(), lines).await
    }
}

/// Opens `path` for appending, creating it if needed.
pub(crate) async fn open_append(path: &std::path::Path) -> Result<File, JournalError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|source| JournalError::Unwritable {
            path: path.to_path_buf(),
            source,
        })
}

/// Bytes read per backward step when looking for the tail of a session.
const TAIL_CHUNK: u64 = 8 * 1024;

/// Returns the last `lines` lines of `path`; a missing file has no lines.
///
/// Reads backwards from the end in [`TAIL_CHUNK`] steps until enough line
/// breaks were seen, so the cost does not grow with the session size.
pub(crate) async fn read_tail(
    path: &std::path::Path,
    lines: usize,
) -> Result<Vec<String>, JournalError> {
    let read_error = |source| JournalError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(read_error(source)),
    };
    if lines == 0 {
        return Ok(Vec::new());
    }

    let mut pos = file.metadata().await.map_err(read_error)?.len();
    let mut buf: Vec<u8> = Vec::new();
    // More than `lines` breaks guarantees `lines` complete lines after the first one.
    while pos > 0 && buf.iter().filter(|&&b| b == b'\n').count() <= lines {
        let step = TAIL_CHUNK.min(pos);
        pos -= step;
        file.seek(SeekFrom::Start(pos)).await.map_err(read_error)?;
        let mut chunk = vec![0; step as usize];
        file.read_exact(&mut chunk).await.map_err(read_error)?;
        chunk.extend_from_slice(&buf);
        buf = chunk;
    }

    let text = String::from_utf8_lossy(&buf);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].iter().map(|l| l.to_string()).collect())
}
