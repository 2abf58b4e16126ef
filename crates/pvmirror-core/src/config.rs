//! Configuration module for pvmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! The configuration is read once at startup and is static for the lifetime of
//! the process.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for pvmirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub paths: PathsConfig,
    pub transfer: TransferConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
    pub alert: AlertConfig,
}

/// Cluster metadata query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Credential file handed to `kubectl --kubeconfig`.
    pub kubeconfig: PathBuf,
    /// Namespace whose persistent volume claims are inspected.
    pub namespace: String,
    /// Optional label selector narrowing the claims (`-l app=db`).
    pub selector: Option<String>,
    /// A storage class containing this substring counts as node-local storage.
    pub local_storage_marker: String,
    /// Path or name of the `kubectl` binary.
    pub kubectl: PathBuf,
}

/// The two mirrored locations and the mount that backs the destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Cluster-attached persistent volume.
    pub source: PathBuf,
    /// Network-attached destination directory.
    pub destination: PathBuf,
    /// Mount point that must be an active remote mount before syncing.
    pub mount_point: PathBuf,
    /// Filesystem type marker the mount point must carry (`nfs` matches `nfs4`).
    pub remote_fs_type: String,
    /// Mount table to inspect.
    pub mounts_table: PathBuf,
}

/// Bulk mirror-copy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Path or name of the `rsync` binary.
    pub rsync: PathBuf,
    /// Extra arguments appended after `-a --delete`.
    pub extra_args: Vec<String>,
    /// Total attempts per transfer invocation.
    pub max_retries: u32,
    /// Seconds to wait between two attempts.
    pub retry_backoff: u64,
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between two iterations of the sync loop.
    pub poll_interval: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory holding one log file per calendar day.
    pub directory: PathBuf,
    /// Console log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Number of trailing log lines attached to signal alerts.
    pub tail_lines: usize,
}

/// Alert webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Endpoint receiving `{"text": ...}` payloads. `None` disables alerts.
    pub webhook_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout: u64,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Errors raised while loading the configuration. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Cannot read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`Config`]
    #[error("Cannot parse configuration {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration parsed but failed validation
    #[error("Invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` and reject the result unless [`Config::validate`] is clean.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/pvmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("pvmirror")
            .join("config.yaml")
    }
}

impl TransferConfig {
    pub fn retry_backoff_duration(&self) -> Duration {
        Duration::from_secs(self.retry_backoff)
    }
}

impl ScheduleConfig {
    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

impl AlertConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubeconfig: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/root"))
                .join(".kube")
                .join("config"),
            namespace: "default".to_string(),
            selector: None,
            local_storage_marker: "local".to_string(),
            kubectl: PathBuf::from("kubectl"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("/data"),
            destination: PathBuf::from("/mnt/nfs/backup"),
            mount_point: PathBuf::from("/mnt/nfs"),
            remote_fs_type: "nfs".to_string(),
            mounts_table: PathBuf::from("/proc/self/mounts"),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            rsync: PathBuf::from("rsync"),
            extra_args: Vec::new(),
            max_retries: 3,
            retry_backoff: 60,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { poll_interval: 360 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("/var/log"))
                .join("pvmirror"),
            level: "info".to_string(),
            tail_lines: 10,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"schedule.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            });
        };

        // --- cluster ---
        if self.cluster.namespace.trim().is_empty() {
            push("cluster.namespace", "must not be empty".into());
        }
        if self.cluster.local_storage_marker.is_empty() {
            push("cluster.local_storage_marker", "must not be empty".into());
        }
        if matches!(&self.cluster.selector, Some(s) if s.trim().is_empty()) {
            push(
                "cluster.selector",
                "must be omitted rather than empty".into(),
            );
        }

        // --- paths ---
        for (field, path) in [
            ("paths.source", &self.paths.source),
            ("paths.destination", &self.paths.destination),
            ("paths.mount_point", &self.paths.mount_point),
        ] {
            if !path.is_absolute() {
                push(
                    field,
                    format!("must be an absolute path: {}", path.display()),
                );
            }
        }
        if self.paths.source == self.paths.destination {
            push(
                "paths.destination",
                "must differ from paths.source".into(),
            );
        }
        if self.paths.remote_fs_type.is_empty() {
            push("paths.remote_fs_type", "must not be empty".into());
        }

        // --- transfer ---
        if self.transfer.max_retries == 0 {
            push("transfer.max_retries", "must be greater than 0".into());
        }
        if self.transfer.retry_backoff == 0 {
            push("transfer.retry_backoff", "must be greater than 0".into());
        }
        if self
            .transfer
            .extra_args
            .iter()
            .any(|arg| arg == "--delete" || arg == "-a")
        {
            push(
                "transfer.extra_args",
                "must not repeat the implicit `-a --delete`".into(),
            );
        }

        // --- schedule ---
        if self.schedule.poll_interval == 0 {
            push("schedule.poll_interval", "must be greater than 0".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }
        if self.logging.tail_lines == 0 {
            push("logging.tail_lines", "must be greater than 0".into());
        }

        // --- alert ---
        if let Some(raw) = &self.alert.webhook_url {
            match url::Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => push(
                    "alert.webhook_url",
                    format!("unsupported scheme '{}'", url.scheme()),
                ),
                Err(e) => push("alert.webhook_url", format!("invalid URL: {e}")),
            }
        }
        if self.alert.timeout == 0 {
            push("alert.timeout", "must be greater than 0".into());
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use pvmirror_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .source(PathBuf::from("/data"))
///     .destination(PathBuf::from("/mnt/nfs/backup"))
///     .poll_interval(600)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- cluster ---

    pub fn kubeconfig(mut self, path: PathBuf) -> Self {
        self.config.cluster.kubeconfig = path;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.cluster.namespace = namespace.into();
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.config.cluster.selector = Some(selector.into());
        self
    }

    pub fn local_storage_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.cluster.local_storage_marker = marker.into();
        self
    }

    // --- paths ---

    pub fn source(mut self, path: PathBuf) -> Self {
        self.config.paths.source = path;
        self
    }

    pub fn destination(mut self, path: PathBuf) -> Self {
        self.config.paths.destination = path;
        self
    }

    pub fn mount_point(mut self, path: PathBuf) -> Self {
        self.config.paths.mount_point = path;
        self
    }

    pub fn remote_fs_type(mut self, fs_type: impl Into<String>) -> Self {
        self.config.paths.remote_fs_type = fs_type.into();
        self
    }

    pub fn mounts_table(mut self, path: PathBuf) -> Self {
        self.config.paths.mounts_table = path;
        self
    }

    // --- transfer ---

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.transfer.max_retries = n;
        self
    }

    pub fn retry_backoff(mut self, seconds: u64) -> Self {
        self.config.transfer.retry_backoff = seconds;
        self
    }

    // --- schedule ---

    pub fn poll_interval(mut self, seconds: u64) -> Self {
        self.config.schedule.poll_interval = seconds;
        self
    }

    // --- logging ---

    pub fn log_directory(mut self, dir: PathBuf) -> Self {
        self.config.logging.directory = dir;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- alert ---

    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.config.alert.webhook_url = Some(url.into());
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
