use anyhow::Result;

use crate::casemap::config::{CasemapConfig, load_config};
use crate::casemap::paths::resolve_paths;
use crate::casemap::store::open_store;
use crate::commands::{CommandReport, record_audit};
use crate::error::{CasemapError, CasemapErrorCode};

#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub strict: bool,
}

fn code_of(err: &anyhow::Error, fallback: CasemapErrorCode) -> CasemapErrorCode {
    err.downcast_ref::<CasemapError>()
        .map(CasemapError::code)
        .unwrap_or(fallback)
}

fn check_store(config: &CasemapConfig, strict: bool) -> CommandReport {
    let mut report = CommandReport::new("verify");
    let store = match open_store(&config.store) {
        Ok(store) => store,
        Err(err) => {
            report.coded_issue(
                code_of(&err, CasemapErrorCode::E003StoreUnavailable),
                format!("{err:#}"),
            );
            return report;
        }
    };
    report.detail(format!("store={}", store.describe()));

    let root = format!("{}/", config.layout.root.trim_end_matches('/'));
    match store.prefix_exists(&root) {
        Ok(true) => report.detail(format!("root prefix {root} found")),
        Ok(false) if strict => report.issue(format!("root prefix {root} has no objects")),
        Ok(false) => report.detail(format!("warning: root prefix {root} has no objects")),
        Err(err) => report.coded_issue(
            CasemapErrorCode::E003StoreUnavailable,
            format!("root probe failed: {err}"),
        ),
    }
    report
}

pub fn run(opts: &VerifyOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("verify");

    report.detail(format!("casemap_home={}", paths.casemap_home.display()));
    report.detail(format!("projects_file={}", paths.projects_file.display()));
    report.detail(format!("documents_file={}", paths.documents_file.display()));
    report.detail(format!("export_dir={}", paths.export_dir.display()));

    for (label, file) in [
        ("projects snapshot", &paths.projects_file),
        ("documents snapshot", &paths.documents_file),
    ] {
        if !file.is_file() {
            report.coded_issue(
                CasemapErrorCode::E002SourceUnavailable,
                format!("missing {label} {}", file.display()),
            );
        }
    }

    let config = match load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            report.coded_issue(
                code_of(&err, CasemapErrorCode::E001ConfigInvalid),
                format!("{err:#}"),
            );
            record_audit(&paths, &report);
            return Ok(report);
        }
    };
    report.detail("config: ok");

    report.merge(check_store(&config, opts.strict));

    record_audit(&paths, &report);
    Ok(report)
}
