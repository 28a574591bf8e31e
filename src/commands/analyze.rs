use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;

use crate::casemap::export;
use crate::casemap::reconcile::ProjectState;
use crate::casemap::util::truncate_with_ellipsis;
use crate::commands::{CommandReport, load_inputs, reconcile, record_audit, summarize};

pub const DEFAULT_SHOW: usize = 15;

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub export_csv: bool,
    pub csv_path: Option<PathBuf>,
    pub show: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            export_csv: false,
            csv_path: None,
            show: DEFAULT_SHOW,
        }
    }
}

pub fn run(opts: &AnalyzeOptions) -> Result<CommandReport> {
    let inputs = load_inputs()?;
    let mut report = CommandReport::new("analyze");

    let result = reconcile(&inputs, &mut report)?;
    summarize(&mut report, &result);

    let stats = &result.run;
    report.detail(format!(
        "projects_with_documents_and_filenames={}",
        stats.projects_considered
    ));
    report.detail(format!(
        "projects_without_documents={}",
        stats.projects_without_documents
    ));
    report.detail(format!(
        "projects_with_documents_but_no_filenames={}",
        stats.projects_without_filenames
    ));

    if stats.unmapped == 0 {
        report.detail("all projects with documents and filenames resolved to a storage folder");
    } else {
        report.detail(format!(
            "unmapped projects (documents with filenames but no storage folder): {}",
            stats.unmapped
        ));
        for outcome in result.outcomes_in(ProjectState::Unmapped).take(opts.show) {
            report.detail(format!(
                "  - {}: {}",
                outcome.project_id,
                truncate_with_ellipsis(&outcome.project_name, 80)
            ));
        }
        if stats.unmapped > opts.show {
            report.detail(format!(
                "  ... and {} more (use --export-csv to see all)",
                stats.unmapped - opts.show
            ));
        }
    }

    if opts.export_csv {
        let rows = export::unmapped_rows(&result, &inputs.config.layout, true);
        let path = opts
            .csv_path
            .clone()
            .unwrap_or_else(|| export::default_export_file(&inputs.paths.export_dir, Local::now()));
        let written = export::write_csv(&path, &rows)?;
        report.detail(format!(
            "exported {written} projects with mapping issues to {}",
            path.display()
        ));
    }

    record_audit(&inputs.paths, &report);
    Ok(report)
}
