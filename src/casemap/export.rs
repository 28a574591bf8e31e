use crate::casemap::candidates::{join_root, review_variants};
use crate::casemap::config::LayoutConfig;
use crate::casemap::reconcile::{ProjectOutcome, ProjectState, ReconcileReport};
use crate::casemap::sanitize::sanitize_project_name;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedReason {
    HasDocsWithFilenamesButNoGcsFolder,
    HasDocsButNoFilenames,
}

/// One row of the unmapped-projects review sheet. Field order is the
/// column order.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub project_id: i64,
    pub project_name: String,
    pub sanitized_name: String,
    pub document_count: usize,
    pub total_size_bytes: i64,
    pub sample_filenames: String,
    pub expected_gcs_path: String,
    pub sanitized_gcs_path: String,
    pub possible_variants: String,
    pub unmapped_reason: UnmappedReason,
}

impl ExportRow {
    fn from_outcome(outcome: &ProjectOutcome, layout: &LayoutConfig, reason: UnmappedReason) -> Self {
        let sanitized_name = sanitize_project_name(&outcome.project_name);
        let (document_count, total_size_bytes, sample_filenames) = match reason {
            UnmappedReason::HasDocsWithFilenamesButNoGcsFolder => (
                outcome.qualifying_documents,
                outcome.total_size_bytes,
                outcome.sample_filenames.join("; "),
            ),
            UnmappedReason::HasDocsButNoFilenames => (outcome.total_documents, 0, String::new()),
        };
        Self {
            project_id: outcome.project_id,
            expected_gcs_path: join_root(&layout.root, &outcome.project_name),
            sanitized_gcs_path: join_root(&layout.root, &sanitized_name),
            possible_variants: review_variants(layout, &outcome.project_name).join("; "),
            project_name: outcome.project_name.clone(),
            sanitized_name,
            document_count,
            total_size_bytes,
            sample_filenames,
            unmapped_reason: reason,
        }
    }
}

/// Rows for every project that needs manual attention.
///
/// Unmapped projects come first in input order. With `include_no_filenames`
/// the projects that have documents but no usable filename follow.
pub fn unmapped_rows(
    report: &ReconcileReport,
    layout: &LayoutConfig,
    include_no_filenames: bool,
) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = report
        .outcomes_in(ProjectState::Unmapped)
        .map(|o| ExportRow::from_outcome(o, layout, UnmappedReason::HasDocsWithFilenamesButNoGcsFolder))
        .collect();
    if include_no_filenames {
        rows.extend(
            report
                .outcomes_in(ProjectState::SkippedNoFilenames)
                .map(|o| ExportRow::from_outcome(o, layout, UnmappedReason::HasDocsButNoFilenames)),
        );
    }
    rows
}

pub fn default_export_file(export_dir: &Path, now: DateTime<Local>) -> PathBuf {
    export_dir.join(format!(
        "unmapped_projects_{}.csv",
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// Write `rows` with a header line, creating parent directories.
pub fn write_csv(path: &Path, rows: &[ExportRow]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    if rows.is_empty() {
        writer.write_record([
            "project_id",
            "project_name",
            "sanitized_name",
            "document_count",
            "total_size_bytes",
            "sample_filenames",
            "expected_gcs_path",
            "sanitized_gcs_path",
            "possible_variants",
            "unmapped_reason",
        ])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}
