//! pvmirror Sync - Directional mirror loop
//!
//! Provides:
//! - Storage topology classification (local vs. network-backed volume)
//! - Delete-mirroring transfers with bounded, fixed-backoff retries
//! - The forever-running scheduler and the signal reporter
//!
//! ## Modules
//!
//! - [`topology`] - Turns cluster and mount facts into a `StorageVerdict`
//! - [`transfer`] - Retrying transfer engine around `IMirrorTransfer`
//! - [`scheduler`] - Inspect, pick direction, transfer, sleep, repeat
//! - [`signals`] - Signal observability and shutdown policy
//! - [`adapters`] - `kubectl`, mount table and `rsync` adapters

pub mod adapters;
pub mod scheduler;
pub mod signals;
pub mod topology;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

use pvmirror_core::domain::SyncDirection;
use thiserror::Error;

pub use scheduler::{IterationOutcome, MirrorScheduler};
pub use signals::{ProcessSignal, SignalAction, SignalReporter};
pub use topology::TopologyInspector;
pub use transfer::{TransferEngine, TransferSuccess};

/// Errors returned by the transfer engine
#[derive(Debug, Error)]
pub enum TransferError {
    /// Every attempt failed; the exhaustion alert has already been sent
    #[error("Sync {direction} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        direction: SyncDirection,
        attempts: u32,
        last_error: String,
    },

    /// Shutdown was requested between attempts
    #[error("Sync {direction} aborted by shutdown after {attempts} attempts")]
    Aborted {
        direction: SyncDirection,
        attempts: u32,
    },

    /// The engine was asked to run a direction that copies nothing
    #[error("Direction {0} does not describe a transfer")]
    NotATransfer(SyncDirection),
}
