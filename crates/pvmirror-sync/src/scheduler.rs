//! Mirror scheduler
//!
//! The forever loop: classify, derive a direction, transfer, sleep. Each
//! iteration is isolated, so neither an error nor a panic inside one can
//! stop the loop. Only the shutdown token ends it.

use std::{any::Any, panic::AssertUnwindSafe, path::PathBuf, time::Duration};

use futures_util::FutureExt;
use pvmirror_core::{config::Config, domain::SyncDirection};
use pvmirror_journal::Notifier;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{topology::TopologyInspector, transfer::TransferEngine, TransferError};

/// How a single iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Nothing was transferred (invalid target or classification error).
    Skipped,
    Synced {
        direction: SyncDirection,
        attempts: u32,
    },
    /// Every attempt failed.
    Failed { direction: SyncDirection },
    /// Shutdown interrupted the retries.
    Aborted { direction: SyncDirection },
    /// The iteration panicked; the panic was contained.
    Panicked,
}

impl IterationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, IterationOutcome::Synced { .. })
    }
}

/// Drives the inspector and the transfer engine on a fixed interval.
pub struct MirrorScheduler {
    inspector: TopologyInspector,
    engine: TransferEngine,
    notifier: Notifier,
    source: PathBuf,
    destination: PathBuf,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl MirrorScheduler {
    pub fn new(
        inspector: TopologyInspector,
        engine: TransferEngine,
        notifier: Notifier,
        config: &Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inspector,
            engine,
            notifier,
            source: config.paths.source.clone(),
            destination: config.paths.destination.clone(),
            poll_interval: config.schedule.poll_interval_duration(),
            shutdown,
        }
    }

    /// Runs iterations until the shutdown token is cancelled.
    ///
    /// The sleep between iterations is cut short by shutdown; an iteration
    /// in progress is not.
    pub async fn run(&self) {
        info!(
            source = %self.source.display(),
            destination = %self.destination.display(),
            poll_interval_secs = self.poll_interval.as_secs(),
            "Mirror scheduler started"
        );

        loop {
            let outcome = self.run_once().await;
            debug!(?outcome, "Iteration finished");

            if self.shutdown.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.notifier.log_info("Mirror scheduler stopped");
    }

    /// Runs exactly one iteration, containing any panic it raises.
    pub async fn run_once(&self) -> IterationOutcome {
        match AssertUnwindSafe(self.iterate()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "Sync iteration panicked");
                self.notifier
                    .log_error(format!("Sync iteration panicked: {message}"));
                IterationOutcome::Panicked
            }
        }
    }

    async fn iterate(&self) -> IterationOutcome {
        let verdict = match self.inspector.classify().await {
            Ok(verdict) => verdict,
            Err(e) => {
                self.notifier.log_error(e.to_string());
                self.notifier
                    .log_warn("Storage topology unknown, skipping this iteration");
                return IterationOutcome::Skipped;
            }
        };

        let direction = SyncDirection::from_verdict(&verdict);
        if direction == SyncDirection::Skip {
            self.notifier
                .log_warn("Mirror target is not usable, skipping this iteration");
            return IterationOutcome::Skipped;
        }

        self.notifier.log_info(format!(
            "Storage is {}, syncing {direction}",
            if verdict.is_local_storage {
                "node-local"
            } else {
                "network-backed"
            }
        ));

        match self
            .engine
            .sync(direction, &self.source, &self.destination)
            .await
        {
            Ok(done) => {
                self.notifier.log_info(format!(
                    "Sync {direction} succeeded after {} attempt(s) in {}s",
                    done.attempts,
                    done.elapsed.as_secs()
                ));
                IterationOutcome::Synced {
                    direction,
                    attempts: done.attempts,
                }
            }
            Err(TransferError::Aborted { .. }) => {
                self.notifier
                    .log_warn(format!("Sync {direction} interrupted by shutdown"));
                IterationOutcome::Aborted { direction }
            }
            Err(e) => {
                self.notifier.log_error(e.to_string());
                IterationOutcome::Failed { direction }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
