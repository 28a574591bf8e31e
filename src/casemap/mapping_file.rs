use crate::casemap::model::{MappingStats, PathMapping};
use crate::casemap::reconcile::{ReconcileReport, mapping_digest};
use crate::casemap::util::now_epoch_secs;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Snapshot of one `map` run. The mapping is rebuilt from scratch every
/// run; this file is never read back as an input to reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingFile {
    pub generated_at_epoch_secs: u64,
    pub bucket: String,
    pub root: String,
    pub digest: String,
    pub stats: MappingStats,
    pub mapping: PathMapping,
}

impl MappingFile {
    pub fn from_report(report: &ReconcileReport, bucket: &str, root: &str) -> Result<Self> {
        Ok(Self {
            generated_at_epoch_secs: now_epoch_secs()?,
            bucket: bucket.to_string(),
            root: root.to_string(),
            digest: report.digest(),
            stats: report.stats,
            mapping: report.mapping.clone(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, format!("{json}\n"))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Load a saved mapping and check its digest still matches.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read mapping file {}", path.display()))?;
        let parsed: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse mapping file {}", path.display()))?;
        let actual = mapping_digest(&parsed.mapping);
        if actual != parsed.digest {
            return Err(anyhow!(
                "mapping file {} digest mismatch: recorded {}, computed {actual}",
                path.display(),
                parsed.digest
            ));
        }
        Ok(parsed)
    }
}
