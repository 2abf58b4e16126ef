//! A single attempt of the transfer engine

use std::path::PathBuf;

use super::direction::SyncDirection;

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// The copy failed; the engine may try again after the backoff.
    TransientFailure,
    /// Shutdown was requested before the attempt could start.
    Aborted,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::TransientFailure => "transient failure",
            AttemptOutcome::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

/// One directional copy attempt, created and discarded inside the engine.
#[derive(Debug, Clone)]
pub struct TransferAttempt {
    pub direction: SyncDirection,
    /// Side being read.
    pub from: PathBuf,
    /// Side being overwritten.
    pub to: PathBuf,
    /// 1-based attempt number.
    pub attempt: u32,
    pub max_attempts: u32,
    pub outcome: Option<AttemptOutcome>,
}

impl TransferAttempt {
    pub fn new(
        direction: SyncDirection,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        attempt: u32,
        max_attempts: u32,
    ) -> Self {
        Self {
            direction,
            from: from.into(),
            to: to.into(),
            attempt,
            max_attempts,
            outcome: None,
        }
    }

    /// Records the outcome, consuming the attempt in builder style.
    pub fn finish(mut self, outcome: AttemptOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// One-line summary used in log messages.
    pub fn describe(&self) -> String {
        let mut s = format!(
            "sync {} attempt {}/{}: {} -> {}",
            self.direction,
            self.attempt,
            self.max_attempts,
            self.from.display(),
            self.to.display()
        );
        if let Some(outcome) = self.outcome {
            s.push_str(&format!(" ({outcome})"));
        }
        s
    }
}
