//! Storage verdicts and the sync direction derived from them

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Result of classifying the current storage topology.
///
/// `is_valid_mirror_target` is only true when the configured mount path is an
/// active mount point *and* its filesystem type matches the expected remote
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVerdict {
    /// Any storage class bound to the inspected claims is node-local.
    pub is_local_storage: bool,
    /// The destination mount can be mirrored to or from.
    pub is_valid_mirror_target: bool,
}

impl StorageVerdict {
    pub fn new(is_local_storage: bool, is_valid_mirror_target: bool) -> Self {
        Self {
            is_local_storage,
            is_valid_mirror_target,
        }
    }

    /// Verdict for a mount target that failed inspection.
    pub fn invalid_target(is_local_storage: bool) -> Self {
        Self::new(is_local_storage, false)
    }
}

/// Which side of the mirror is authoritative for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Mirror the persistent volume onto the network destination.
    ToDestination,
    /// Restore the persistent volume from the network destination.
    ToSource,
    /// Do nothing this iteration.
    Skip,
}

impl SyncDirection {
    /// Derives the direction from a verdict.
    ///
    /// Pure function: an invalid mirror target always skips; otherwise local
    /// storage pushes to the destination and anything else pulls back to the
    /// source.
    pub fn from_verdict(verdict: &StorageVerdict) -> Self {
        if !verdict.is_valid_mirror_target {
            SyncDirection::Skip
        } else if verdict.is_local_storage {
            SyncDirection::ToDestination
        } else {
            SyncDirection::ToSource
        }
    }

    /// Orders `(source, dest)` into the `(from, to)` pair this direction copies.
    ///
    /// Returns `None` for [`SyncDirection::Skip`].
    pub fn endpoints<'a>(&self, source: &'a Path, dest: &'a Path) -> Option<(&'a Path, &'a Path)> {
        match self {
            SyncDirection::ToDestination => Some((source, dest)),
            SyncDirection::ToSource => Some((dest, source)),
            SyncDirection::Skip => None,
        }
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncDirection::ToDestination => "to-destination",
            SyncDirection::ToSource => "to-source",
            SyncDirection::Skip => "skip",
        };
        write!(f, "{}", s)
    }
}
