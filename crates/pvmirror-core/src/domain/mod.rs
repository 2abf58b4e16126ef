//! Domain types for the mirror daemon
//!
//! Everything here is transient, process-wide state derived fresh on each
//! scheduler iteration. Nothing in this module is persisted.

pub mod direction;
pub mod errors;
pub mod transfer;

pub use direction::{StorageVerdict, SyncDirection};
pub use errors::ClassificationError;
pub use transfer::{AttemptOutcome, TransferAttempt};
