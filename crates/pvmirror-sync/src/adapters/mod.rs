//! Production adapters for the core ports
//!
//! - [`kubectl`] - [`IClusterMetadata`](pvmirror_core::ports::IClusterMetadata) via `kubectl get pvc`
//! - [`mounts`] - [`IMountTable`](pvmirror_core::ports::IMountTable) over `/proc/self/mounts`
//! - [`rsync`] - [`IMirrorTransfer`](pvmirror_core::ports::IMirrorTransfer) via `rsync -a --delete`

pub mod kubectl;
pub mod mounts;
pub mod rsync;

pub use kubectl::KubectlMetadata;
pub use mounts::ProcMountTable;
pub use rsync::RsyncTransfer;
