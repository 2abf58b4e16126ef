//! `kubectl`-backed cluster metadata
//!
//! Runs `kubectl get pvc` with a jsonpath template that prints the storage
//! class of every matching claim, separated by spaces.

use std::{ffi::OsString, path::PathBuf, process::Stdio};

use anyhow::{bail, Context};
use async_trait::async_trait;
use pvmirror_core::{config::ClusterConfig, ports::IClusterMetadata};
use tokio::process::Command;
use tracing::debug;

const STORAGE_CLASS_TEMPLATE: &str = "jsonpath={.items[*].spec.storageClassName}";

/// Queries persistent volume claims through the `kubectl` CLI
#[derive(Debug, Clone)]
pub struct KubectlMetadata {
    kubectl: PathBuf,
    kubeconfig: PathBuf,
    namespace: String,
    selector: Option<String>,
}

impl KubectlMetadata {
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            kubectl: config.kubectl.clone(),
            kubeconfig: config.kubeconfig.clone(),
            namespace: config.namespace.clone(),
            selector: config.selector.clone(),
        }
    }

    /// Arguments passed to `kubectl`, in order
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--kubeconfig".into(),
            self.kubeconfig.clone().into(),
            "get".into(),
            "pvc".into(),
            "-n".into(),
            self.namespace.clone().into(),
        ];
        if let Some(selector) = &self.selector {
            args.push("-l".into());
            args.push(selector.into());
        }
        args.push("-o".into());
        args.push(STORAGE_CLASS_TEMPLATE.into());
        args
    }
}

/// Splits the jsonpath output into class names; empty output means no claims.
fn parse_storage_classes(stdout: &str) -> Vec<String> {
    stdout.split_whitespace().map(str::to_string).collect()
}

#[async_trait]
impl IClusterMetadata for KubectlMetadata {
    async fn storage_classes(&self) -> anyhow::Result<Vec<String>> {
        let output = Command::new(&self.kubectl)
            .args(self.args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.kubectl.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} exited with {}: {}",
                self.kubectl.display(),
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8(output.stdout)
            .context("kubectl printed non UTF-8 storage class names")?;
        let classes = parse_storage_classes(&stdout);
        debug!(namespace = %self.namespace, count = classes.len(), "Listed storage classes");
        Ok(classes)
    }
}
