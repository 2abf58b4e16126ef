//! Cluster metadata port (driven/secondary port)
//!
//! The only cluster fact the daemon needs is the list of storage class
//! names bound to the persistent volume claims it watches. How that list
//! is obtained (`kubectl`, an API client, a fixture) is up to the adapter.

/// Port trait for querying the cluster's storage topology
///
/// ## Implementation Notes
///
/// - No retries: a failed query is reported once and the caller skips the
///   current iteration.
/// - Claims without an explicit storage class are simply absent from the
///   returned list.
#[async_trait::async_trait]
pub trait IClusterMetadata: Send + Sync {
    /// Returns the storage class names of the watched claims
    async fn storage_classes(&self) -> anyhow::Result<Vec<String>>;
}
