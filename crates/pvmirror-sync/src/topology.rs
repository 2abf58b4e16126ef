//! Topology inspector
//!
//! Combines the two external facts the sync direction depends on: whether
//! the watched claims sit on node-local storage, and whether the remote
//! destination is really mounted.

use std::{path::PathBuf, sync::Arc};

use pvmirror_core::{
    config::Config,
    domain::{ClassificationError, StorageVerdict},
    ports::{IClusterMetadata, IMountTable},
};
use pvmirror_journal::Notifier;
use tracing::debug;

/// Classifies the current storage topology once per scheduler iteration.
pub struct TopologyInspector {
    metadata: Arc<dyn IClusterMetadata>,
    mounts: Arc<dyn IMountTable>,
    notifier: Notifier,
    local_marker: String,
    mount_point: PathBuf,
    remote_fs_type: String,
}

impl TopologyInspector {
    pub fn new(
        metadata: Arc<dyn IClusterMetadata>,
        mounts: Arc<dyn IMountTable>,
        notifier: Notifier,
        config: &Config,
    ) -> Self {
        Self {
            metadata,
            mounts,
            notifier,
            local_marker: config.cluster.local_storage_marker.clone(),
            mount_point: config.paths.mount_point.clone(),
            remote_fs_type: config.paths.remote_fs_type.clone(),
        }
    }

    /// Queries cluster metadata and the mount table and builds a verdict.
    ///
    /// A failing query is returned as an error without alerting. A mount
    /// point that is missing or carries the wrong filesystem is not an
    /// error: it is alerted once here and reported as an invalid target.
    pub async fn classify(&self) -> Result<StorageVerdict, ClassificationError> {
        let classes = self
            .metadata
            .storage_classes()
            .await
            .map_err(ClassificationError::ClusterQuery)?;
        let is_local = classes.iter().any(|c| c.contains(&self.local_marker));
        debug!(?classes, is_local, "Storage classes inspected");

        // One lookup answers both questions, so they cannot disagree.
        let entry = self
            .mounts
            .lookup(&self.mount_point)
            .await
            .map_err(|reason| ClassificationError::MountInspection {
                path: self.mount_point.clone(),
                reason,
            })?;
        let Some(entry) = entry else {
            self.notifier
                .error_with_alert(&format!(
                    "{} is not a mount point",
                    self.mount_point.display()
                ))
                .await;
            return Ok(StorageVerdict::invalid_target(is_local));
        };

        if !entry.fs_type.contains(&self.remote_fs_type) {
            self.notifier
                .error_with_alert(&format!(
                    "{} is a mount point but not an {} mount",
                    self.mount_point.display(),
                    self.remote_fs_type.to_uppercase()
                ))
                .await;
            return Ok(StorageVerdict::invalid_target(is_local));
        }

        debug!(
            path = %self.mount_point.display(),
            source = %entry.source,
            fs_type = %entry.fs_type,
            "Mirror target is mounted"
        );
        Ok(StorageVerdict::new(is_local, true))
    }
}
