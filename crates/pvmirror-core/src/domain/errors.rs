//! Domain error types

use std::path::PathBuf;

use thiserror::Error;

/// Failures while classifying the storage topology.
///
/// None of these are fatal; the scheduler treats them as a skipped iteration.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The cluster metadata query failed or returned garbage
    #[error("Cluster metadata query failed: {0:#}")]
    ClusterQuery(anyhow::Error),

    /// The mount table could not be read
    #[error("Mount inspection of {} failed: {reason:#}", .path.display())]
    MountInspection { path: PathBuf, reason: anyhow::Error },
}
