//! Mount table port (driven/secondary port)
//!
//! Answers two questions about an absolute path: is it an active mount
//! point, and if so, which filesystem type is mounted there.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One active mount, as listed in the mount table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    /// Mounted device or export, e.g. `nas:/export/backup`.
    pub source: String,
    /// Mount point.
    pub target: PathBuf,
    /// Filesystem type, e.g. `nfs4`.
    pub fs_type: String,
}

/// Port trait for mount table inspection
///
/// Adapters only implement [`lookup`](IMountTable::lookup); the two
/// convenience questions below are derived from it.
#[async_trait::async_trait]
pub trait IMountTable: Send + Sync {
    /// Returns the active mount whose target is exactly `path`, if any
    ///
    /// When several entries share a target the most recent one wins, since
    /// it hides the others.
    async fn lookup(&self, path: &Path) -> anyhow::Result<Option<MountEntry>>;

    /// Returns true if `path` is an active mount point
    async fn is_mount_point(&self, path: &Path) -> anyhow::Result<bool> {
        Ok(self.lookup(path).await?.is_some())
    }

    /// Returns the filesystem type mounted at `path`, if it is a mount point
    async fn fs_type(&self, path: &Path) -> anyhow::Result<Option<String>> {
        Ok(self.lookup(path).await?.map(|entry| entry.fs_type))
    }
}
