//! In-memory doubles of the core ports, shared by the unit tests

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use pvmirror_core::ports::{
    IAlertChannel, IClusterMetadata, IMirrorTransfer, IMountTable, ITransferOutput, MountEntry,
    OutputStream,
};
use pvmirror_journal::{Journal, Notifier};
use tokio::time::Instant;

/// Cluster metadata returning a fixed answer, counting calls
pub(crate) struct StaticMetadata {
    answer: Result<Vec<String>, String>,
    pub calls: AtomicUsize,
}

impl StaticMetadata {
    pub fn classes(classes: &[&str]) -> Self {
        Self {
            answer: Ok(classes.iter().map(|c| c.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IClusterMetadata for StaticMetadata {
    async fn storage_classes(&self) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(classes) => Ok(classes.clone()),
            Err(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

/// Mount table holding a fixed list of entries
pub(crate) struct FixedMounts {
    entries: Vec<MountEntry>,
    fail: bool,
}

impl FixedMounts {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            fail: false,
        }
    }

    pub fn with(target: &str, fs_type: &str) -> Self {
        Self {
            entries: vec![MountEntry {
                source: "nas:/export".to_string(),
                target: PathBuf::from(target),
                fs_type: fs_type.to_string(),
            }],
            fail: false,
        }
    }

    pub fn unreadable() -> Self {
        Self {
            entries: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl IMountTable for FixedMounts {
    async fn lookup(&self, path: &Path) -> anyhow::Result<Option<MountEntry>> {
        if self.fail {
            anyhow::bail!("permission denied");
        }
        Ok(self.entries.iter().rev().find(|e| e.target == path).cloned())
    }
}

/// One recorded call to [`ScriptedTransfer::mirror`]
#[derive(Debug, Clone)]
pub(crate) struct MirrorCall {
    pub from: PathBuf,
    pub to: PathBuf,
    pub started: Instant,
}

/// Transfer double that plays back a script of outcomes
///
/// Each call pops the next outcome; once the script is empty every call
/// succeeds. Every call prints one stdout line, and failing calls one
/// stderr line.
pub(crate) struct ScriptedTransfer {
    script: Mutex<VecDeque<Result<(), String>>>,
    duration: Duration,
    pub calls: Mutex<Vec<MirrorCall>>,
}

impl ScriptedTransfer {
    pub fn new(script: Vec<Result<(), String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            duration: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing(times: usize) -> Self {
        Self::new((0..times).map(|i| Err(format!("rsync exit 23 (#{i})"))).collect())
    }

    /// Each call takes `duration` of (virtual) time before finishing.
    pub fn taking(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<MirrorCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IMirrorTransfer for ScriptedTransfer {
    async fn mirror(
        &self,
        from: &Path,
        to: &Path,
        output: &dyn ITransferOutput,
    ) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(MirrorCall {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            started: Instant::now(),
        });
        output.line(OutputStream::Stdout, "sending incremental file list");

        if !self.duration.is_zero() {
            tokio::time::sleep(self.duration).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Err(message)) => {
                output.line(OutputStream::Stderr, &message);
                Err(anyhow::anyhow!("{message}"))
            }
            _ => Ok(()),
        }
    }
}

/// Alert channel recording every message
#[derive(Default)]
pub(crate) struct RecordingAlerts {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingAlerts {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl IAlertChannel for RecordingAlerts {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Journal in a fresh temp dir plus a notifier wired to recording alerts.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub(crate) async fn notifier() -> (tempfile::TempDir, Notifier, Arc<RecordingAlerts>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let (journal, _writer) = Journal::open(dir.path()).await.expect("open journal");
    let alerts = Arc::new(RecordingAlerts::default());
    let notifier = Notifier::new(journal, Some(alerts.clone()));
    (dir, notifier, alerts)
}
