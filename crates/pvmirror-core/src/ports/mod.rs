//! Port definitions (hexagonal architecture interfaces)
//!
//! The mirror daemon talks to four external collaborators, each hidden
//! behind one of these traits so the decision loop can be exercised with
//! in-memory doubles.
//!
//! ## Ports Overview
//!
//! - [`IClusterMetadata`] - Storage classes bound to the watched claims
//! - [`IMountTable`] - Mount point and filesystem type facts
//! - [`IMirrorTransfer`] - Delete-mirroring bulk copy with line output
//! - [`IAlertChannel`] - Free-text alerts to an external channel

pub mod alert_channel;
pub mod cluster_metadata;
pub mod mirror_transfer;
pub mod mount_table;

pub use alert_channel::IAlertChannel;
pub use cluster_metadata::IClusterMetadata;
pub use mirror_transfer::{IMirrorTransfer, ITransferOutput, OutputStream};
pub use mount_table::{IMountTable, MountEntry};
