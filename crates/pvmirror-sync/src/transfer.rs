//! Transfer engine
//!
//! Runs one directional mirror with a bounded number of attempts and a
//! fixed pause between them. Attempts are never cancelled once started;
//! shutdown is only observed before an attempt and during the pause.

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use pvmirror_core::{
    config::TransferConfig,
    domain::{AttemptOutcome, SyncDirection, TransferAttempt},
    ports::IMirrorTransfer,
};
use pvmirror_journal::Notifier;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::TransferError;

/// Summary of a transfer that succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSuccess {
    pub direction: SyncDirection,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Retrying wrapper around an [`IMirrorTransfer`].
pub struct TransferEngine {
    transfer: Arc<dyn IMirrorTransfer>,
    notifier: Notifier,
    max_attempts: u32,
    backoff: Duration,
    shutdown: CancellationToken,
}

impl TransferEngine {
    pub fn new(
        transfer: Arc<dyn IMirrorTransfer>,
        notifier: Notifier,
        config: &TransferConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transfer,
            notifier,
            max_attempts: config.max_retries.max(1),
            backoff: config.retry_backoff_duration(),
            shutdown,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Mirrors in `direction` between `source` and `dest`.
    ///
    /// Every transfer output line lands in the journal. After the last
    /// failed attempt exactly one alert is sent, naming the direction and
    /// both paths.
    pub async fn sync(
        &self,
        direction: SyncDirection,
        source: &Path,
        dest: &Path,
    ) -> Result<TransferSuccess, TransferError> {
        let (from, to) = direction
            .endpoints(source, dest)
            .ok_or(TransferError::NotATransfer(direction))?;

        let started = Instant::now();
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let current = TransferAttempt::new(direction, from, to, attempt, self.max_attempts);

            if self.shutdown.is_cancelled() {
                let aborted = current.finish(AttemptOutcome::Aborted);
                self.notifier.log_warn(aborted.describe());
                return Err(TransferError::Aborted {
                    direction,
                    attempts: attempt - 1,
                });
            }

            self.notifier.log_info(format!("Starting {}", current.describe()));

            match self
                .transfer
                .mirror(from, to, self.notifier.journal())
                .await
            {
                Ok(()) => {
                    let done = current.finish(AttemptOutcome::Success);
                    self.notifier.log_info(done.describe());
                    info!(%direction, attempt, "Transfer completed");
                    return Ok(TransferSuccess {
                        direction,
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    });
                }
                Err(e) => {
                    let failed = current.finish(AttemptOutcome::TransientFailure);
                    last_error = format!("{e:#}");
                    self.notifier
                        .log_error(format!("{}: {last_error}", failed.describe()));

                    if failed.is_last() {
                        break;
                    }
                }
            }

            debug!(
                %direction,
                attempt,
                backoff_secs = self.backoff.as_secs(),
                "Waiting before retry"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.backoff) => {}
                _ = self.shutdown.cancelled() => {
                    warn!(%direction, attempt, "Shutdown requested during retry backoff");
                    self.notifier.log_warn(format!(
                        "Sync {direction} aborted after {attempt} attempts: shutting down"
                    ));
                    return Err(TransferError::Aborted {
                        direction,
                        attempts: attempt,
                    });
                }
            }
        }

        self.notifier
            .error_with_alert(&format!(
                "Sync {direction} from {} to {} failed after {} attempts: {last_error}",
                from.display(),
                to.display(),
                self.max_attempts
            ))
            .await;

        Err(TransferError::Exhausted {
            direction,
            attempts: self.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::test_support::{self, ScriptedTransfer};

    fn engine(
        transfer: Arc<ScriptedTransfer>,
        notifier: Notifier,
        shutdown: CancellationToken,
    ) -> TransferEngine {
        TransferEngine::new(transfer, notifier, &TransferConfig::default(), shutdown)
    }

    fn paths() -> (PathBuf, PathBuf) {
        (PathBuf::from("/data"), PathBuf::from("/mnt/nfs/backup"))
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_without_alert() {
        let (_dir, notifier, alerts) = test_support::notifier().await;
        let transfer = Arc::new(ScriptedTransfer::new(vec![Ok(())]));
        let engine = engine(transfer.clone(), notifier, CancellationToken::new());
        let (source, dest) = paths();

        let done = engine
            .sync(SyncDirection::ToDestination, &source, &dest)
            .await
            .unwrap();

        assert_eq!(done.attempts, 1);
        assert_eq!(transfer.call_count(), 1);
        assert!(alerts.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn direction_picks_endpoints() {
        let (_dir, notifier, _alerts) = test_support::notifier().await;
        let transfer = Arc::new(ScriptedTransfer::new(vec![]));
        let engine = engine(transfer.clone(), notifier, CancellationToken::new());
        let (source, dest) = paths();

        engine
            .sync(SyncDirection::ToDestination, &source, &dest)
            .await
            .unwrap();
        engine
            .sync(SyncDirection::ToSource, &source, &dest)
            .await
            .unwrap();

        let calls = transfer.calls();
        assert_eq!((&calls[0].from, &calls[0].to), (&source, &dest));
        assert_eq!((&calls[1].from, &calls[1].to), (&dest, &source));
    }

    #[tokio::test(start_paused = true)]
    async fn skip_never_invokes_transfer() {
        let (_dir, notifier, _alerts) = test_support::notifier().await;
        let transfer = Arc::new(ScriptedTransfer::new(vec![]));
        let engine = engine(transfer.clone(), notifier, CancellationToken::new());
        let (source, dest) = paths();

        let err = engine
            .sync(SyncDirection::Skip, &source, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::NotATransfer(SyncDirection::Skip)));
        assert_eq!(transfer.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_second_attempt_after_one_backoff() {
        let (_dir, notifier, alerts) = test_support::notifier().await;
        let transfer = Arc::new(ScriptedTransfer::new(vec![Err("timeout".into()), Ok(())]));
        let engine = engine(transfer.clone(), notifier, CancellationToken::new());
        let (source, dest) = paths();

        let done = engine
            .sync(SyncDirection::ToSource, &source, &dest)
            .await
            .unwrap();

        assert_eq!(done.attempts, 2);
        let calls = transfer.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].started - calls[0].started, Duration::from_secs(60));
        assert!(alerts.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_sends_exactly_one_alert() {
        let (_dir, notifier, alerts) = test_support::notifier().await;
        let transfer = Arc::new(ScriptedTransfer::always_failing(10));
        let engine = engine(transfer.clone(), notifier, CancellationToken::new());
        let (source, dest) = paths();

        let err = engine
            .sync(SyncDirection::ToDestination, &source, &dest)
            .await
            .unwrap_err();

        match err {
            TransferError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }

        let calls = transfer.calls();
        assert_eq!(calls.len(), 3, "never more than max_retries attempts");
        for pair in calls.windows(2) {
            assert_eq!(pair[1].started - pair[0].started, Duration::from_secs(60));
        }

        let sent = alerts.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("to-destination"));
        assert!(sent[0].contains("/data"));
        assert!(sent[0].contains("/mnt/nfs/backup"));
    }

    #[tokio::test(start_paused = true)]
    async fn transfer_output_is_journaled() {
        let (_dir, notifier, _alerts) = test_support::notifier().await;
        let journal = notifier.journal().clone();
        let transfer = Arc::new(ScriptedTransfer::new(vec![Err("rsync: link_stat failed".into())]));
        let engine = engine(transfer, notifier, CancellationToken::new());
        let (source, dest) = paths();

        engine
            .sync(SyncDirection::ToDestination, &source, &dest)
            .await
            .unwrap();

        let lines = journal.tail(50).await.unwrap();
        assert!(lines
            .iter()
            .any(|l| l.contains("[INFO]: sending incremental file list")));
        assert!(lines
            .iter()
            .any(|l| l.contains("[ERROR]: rsync: link_stat failed")));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_backoff_aborts_without_alert() {
        let (_dir, notifier, alerts) = test_support::notifier().await;
        let transfer = Arc::new(ScriptedTransfer::always_failing(3));
        let shutdown = CancellationToken::new();
        let engine = engine(transfer.clone(), notifier, shutdown.clone());
        let (source, dest) = paths();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let err = engine
            .sync(SyncDirection::ToDestination, &source, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Aborted { attempts: 1, .. }));
        assert_eq!(transfer.call_count(), 1);
        assert!(alerts.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_start_runs_nothing() {
        let (_dir, notifier, _alerts) = test_support::notifier().await;
        let transfer = Arc::new(ScriptedTransfer::new(vec![]));
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let engine = engine(transfer.clone(), notifier, shutdown);
        let (source, dest) = paths();

        let err = engine
            .sync(SyncDirection::ToSource, &source, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Aborted { attempts: 0, .. }));
        assert_eq!(transfer.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn running_attempt_finishes_despite_shutdown() {
        let (_dir, notifier, _alerts) = test_support::notifier().await;
        let transfer =
            Arc::new(ScriptedTransfer::new(vec![Ok(())]).taking(Duration::from_secs(120)));
        let shutdown = CancellationToken::new();
        let engine = engine(transfer.clone(), notifier, shutdown.clone());
        let (source, dest) = paths();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let done = engine
            .sync(SyncDirection::ToDestination, &source, &dest)
            .await
            .unwrap();
        assert_eq!(done.attempts, 1);
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn zero_retries_still_runs_once() {
        let (_dir, notifier, _alerts) = test_support::notifier().await;
        let config = TransferConfig {
            max_retries: 0,
            ..Default::default()
        };
        let engine = TransferEngine::new(
            Arc::new(ScriptedTransfer::new(vec![])),
            notifier,
            &config,
            CancellationToken::new(),
        );

        assert_eq!(engine.max_attempts(), 1);
        assert_eq!(engine.backoff(), Duration::from_secs(60));
    }
}
