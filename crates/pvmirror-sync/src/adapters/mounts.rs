//! Mount table adapter over `/proc/self/mounts`
//!
//! Each line is `source target fstype options dump pass`. Whitespace and
//! backslashes inside the first two fields are octal-escaped by the kernel
//! (`/mnt/my\040share`).

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use pvmirror_core::ports::{IMountTable, MountEntry};

/// Reads the mount table fresh on every lookup
#[derive(Debug, Clone)]
pub struct ProcMountTable {
    table: PathBuf,
}

impl ProcMountTable {
    pub fn new(table: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &Path {
        &self.table
    }
}

impl Default for ProcMountTable {
    fn default() -> Self {
        Self::new("/proc/self/mounts")
    }
}

/// Parses mount table content, skipping malformed lines
pub(crate) fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let target = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                source: unescape(source),
                target: PathBuf::from(unescape(target)),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

/// Decodes the kernel's `\ooo` octal escapes
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[async_trait]
impl IMountTable for ProcMountTable {
    async fn lookup(&self, path: &Path) -> anyhow::Result<Option<MountEntry>> {
        let content = tokio::fs::read_to_string(&self.table)
            .await
            .with_context(|| format!("Failed to read mount table {}", self.table.display()))?;

        // Later entries are stacked on top of earlier ones.
        Ok(parse_mounts(&content)
            .into_iter()
            .rev()
            .find(|entry| entry.target == path))
    }
}
