//! `rsync` mirror adapter
//!
//! Runs `rsync -a --delete [extra args] <from>/ <to>/`. The trailing slashes
//! make rsync copy directory contents rather than nest `from` inside `to`.
//! Output is forwarded line by line while the process runs.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{bail, Context};
use async_trait::async_trait;
use pvmirror_core::{
    config::TransferConfig,
    ports::{IMirrorTransfer, ITransferOutput, OutputStream},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    sync::mpsc,
};
use tracing::debug;

/// Delete-mirroring copy through the `rsync` CLI
#[derive(Debug, Clone)]
pub struct RsyncTransfer {
    rsync: PathBuf,
    extra_args: Vec<String>,
}

impl RsyncTransfer {
    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            rsync: config.rsync.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    /// Arguments passed to `rsync`, in order
    pub fn args(&self, from: &Path, to: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-a".into(), "--delete".into()];
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push(with_trailing_slash(from));
        args.push(with_trailing_slash(to));
        args
    }
}

fn with_trailing_slash(path: &Path) -> OsString {
    let mut s = path.as_os_str().to_os_string();
    if !s.to_string_lossy().ends_with('/') {
        s.push("/");
    }
    s
}

/// Human-readable meaning of the rsync exit codes operators run into most.
fn describe_exit_code(code: i32) -> &'static str {
    match code {
        1 => "syntax or usage error",
        2 => "protocol incompatibility",
        3 => "errors selecting input/output files or directories",
        5 => "error starting client-server protocol",
        10 => "error in socket I/O",
        11 => "error in file I/O",
        12 => "error in rsync protocol data stream",
        20 => "received SIGUSR1 or SIGINT",
        23 => "partial transfer due to error",
        24 => "partial transfer due to vanished source files",
        30 => "timeout in data send/receive",
        35 => "timeout waiting for daemon connection",
        _ => "unknown error",
    }
}

/// Reads `reader` line by line into `tx` until EOF. Invalid UTF-8 is
/// replaced rather than dropping the line.
async fn forward_lines<R>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<(OutputStream, String)>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                if tx.send((stream, line.to_string())).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, ?stream, "Stopped reading rsync output");
                break;
            }
        }
    }
}

#[async_trait]
impl IMirrorTransfer for RsyncTransfer {
    async fn mirror(
        &self,
        from: &Path,
        to: &Path,
        output: &dyn ITransferOutput,
    ) -> anyhow::Result<()> {
        let args = self.args(from, to);
        debug!(rsync = %self.rsync.display(), ?args, "Spawning rsync");

        let mut child = Command::new(&self.rsync)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.rsync.display()))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, OutputStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        while let Some((stream, line)) = rx.recv().await {
            output.line(stream, &line);
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for {}", self.rsync.display()))?;

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => bail!("rsync exited with code {code} ({})", describe_exit_code(code)),
            None => bail!("rsync was terminated by a signal"),
        }
    }
}
