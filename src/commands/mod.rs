pub mod analyze;
pub mod init;
pub mod map;
pub mod urls;
pub mod verify;

use anyhow::Result;
use serde::Serialize;
use tracing::warn;

use crate::casemap::audit;
use crate::casemap::config::{CasemapConfig, load_config};
use crate::casemap::model::{Document, Project};
use crate::casemap::paths::{CasemapPaths, resolve_paths};
use crate::casemap::reconcile::{ReconcileReport, Reconciler};
use crate::casemap::source::{JsonSnapshotSource, SourceReader};
use crate::casemap::store::open_store;
use crate::error::CasemapErrorCode;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn coded_issue(&mut self, code: CasemapErrorCode, text: impl AsRef<str>) {
        self.issue(format!("{}: {}", code.as_str(), text.as_ref()));
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }
}

/// Everything a reconciliation run reads before the first probe.
pub(crate) struct RunInputs {
    pub config: CasemapConfig,
    pub paths: CasemapPaths,
    pub projects: Vec<Project>,
    pub documents: Vec<Document>,
}

pub(crate) fn load_inputs() -> Result<RunInputs> {
    let config = load_config()?;
    let paths = resolve_paths()?;
    let source = JsonSnapshotSource::new(&paths.projects_file, &paths.documents_file);
    let projects = source.list_projects()?;
    let documents = source.list_documents()?;
    Ok(RunInputs {
        config,
        paths,
        projects,
        documents,
    })
}

/// Open the configured store and reconcile every project against it.
pub(crate) fn reconcile(inputs: &RunInputs, report: &mut CommandReport) -> Result<ReconcileReport> {
    let store = open_store(&inputs.config.store)?;
    report.detail(format!("store={}", store.describe()));
    report.detail(format!("root={}", inputs.config.layout.root));
    Ok(Reconciler::new(store.as_ref(), &inputs.config).run(&inputs.projects, &inputs.documents))
}

pub(crate) fn summarize(report: &mut CommandReport, run: &ReconcileReport) {
    let stats = &run.run;
    report.detail(format!(
        "projects={} documents={} qualifying_documents={}",
        stats.projects_total, stats.documents_total, stats.documents_qualifying
    ));
    report.detail(format!(
        "mapped={} fallback_mapped={} unmapped={}",
        stats.mapped, stats.fallback_mapped, stats.unmapped
    ));
    report.detail(format!(
        "total_projects_mapped={} unique_paths={}",
        run.stats.total_projects_mapped, run.stats.unique_paths
    ));
    report.detail(format!(
        "probes={} probe_failures={}",
        stats.probes, stats.probe_failures
    ));
    if stats.duplicate_projects_ignored > 0 {
        report.detail(format!(
            "duplicate_projects_ignored={}",
            stats.duplicate_projects_ignored
        ));
    }
    if run.store_degraded() {
        report.coded_issue(
            CasemapErrorCode::E004StoreDegraded,
            format!(
                "all {} store probes failed; unmapped counts are not trustworthy",
                stats.probes
            ),
        );
    }
}

/// Append one audit line for the command; a failure here is logged, not
/// surfaced as a report issue.
pub(crate) fn record_audit(paths: &CasemapPaths, report: &CommandReport) {
    let status = if report.ok { "ok" } else { "failed" };
    let message = report
        .issues
        .first()
        .or(report.details.last())
        .cloned()
        .unwrap_or_default();
    if let Err(err) = audit::append_event(paths, &report.command, status, &message) {
        warn!(command = %report.command, error = %err, "failed to append audit event");
    }
}
