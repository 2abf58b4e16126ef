//! pvmirror Core - Domain types, port traits and configuration
//!
//! This crate holds everything the mirror daemon reasons about without
//! touching the outside world:
//! - **Domain** - `SyncDirection`, `StorageVerdict`, `TransferAttempt`
//! - **Ports** - Traits for adapters: `IClusterMetadata`, `IMountTable`,
//!   `IMirrorTransfer`, `IAlertChannel`
//! - **Config** - The YAML configuration file, defaults and validation
//!
//! # Architecture
//!
//! Same ports & adapters split as the rest of the workspace: the domain
//! module is pure, ports are trait interfaces, and the adapters that shell
//! out to `kubectl`/`rsync` or speak HTTP live in the adapter crates.

pub mod config;
pub mod domain;
pub mod ports;
