//! Mirror transfer port (driven/secondary port)
//!
//! The bulk copy is treated as opaque: it mirrors one directory tree onto
//! another, deleting entries on the receiving side that are absent from the
//! sending side, and reports progress as lines of text.
//!
//! ## Design Notes
//!
//! - Each call is a full mirror. A failed call may leave the receiving side
//!   partially updated; calling again converges because the primitive
//!   compares against current state.
//! - Output lines are pushed to an [`ITransferOutput`] sink as they are
//!   produced, not collected at the end.

use std::path::Path;

/// Which output stream of the copy tool a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives transfer output line by line
pub trait ITransferOutput: Send + Sync {
    /// Called once per line, without the trailing newline
    fn line(&self, stream: OutputStream, line: &str);
}

/// Port trait for the delete-mirroring bulk copy
#[async_trait::async_trait]
pub trait IMirrorTransfer: Send + Sync {
    /// Mirrors the tree at `from` onto `to`
    ///
    /// # Arguments
    /// * `from` - Directory whose contents are authoritative
    /// * `to` - Directory made identical to `from`, extraneous entries deleted
    /// * `output` - Sink for every line the copy tool prints
    ///
    /// # Returns
    /// `Ok(())` only if the copy completed successfully
    async fn mirror(&self, from: &Path, to: &Path, output: &dyn ITransferOutput)
        -> anyhow::Result<()>;
}
