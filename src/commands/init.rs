use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::casemap::paths::resolve_paths;
use crate::commands::{CommandReport, record_audit};

const SAMPLE_ENV: &str = r#"# Google Cloud Storage
GCS_PROJECT_ID=dataengineerng
GCS_BUCKET_NAME=bennett_bucket1
# GCS_ACCESS_TOKEN=ya29.your-oauth-token
# CASEMAP_GCS_ENDPOINT=https://storage.googleapis.com

# Offline analysis against a saved listing (gsutil ls -r gs://bucket/** > listing.txt)
# CASEMAP_STORE_BACKEND=manifest
# CASEMAP_STORE_MANIFEST=/path/to/listing.txt

# Legacy database snapshot
# CASEMAP_PROJECTS_FILE=/path/to/projects.json
# CASEMAP_DOCUMENTS_FILE=/path/to/documents.json

# Folder layout
CASEMAP_ROOT_PREFIX="docs/Bennett Legal"
CASEMAP_FALLBACK_FOLDER=zzz_mailroom_no_project_assigned
CASEMAP_VARIANT_PREFIXES="Solar - |Solar - PNC "

# Run settings
MIGRATION_MAX_CONCURRENT=5
CASEMAP_FALLBACK_SAMPLE_SIZE=3
CASEMAP_FOLDER_BOUNDARY=false
CASEMAP_REQUEST_TIMEOUT_SECS=20
CASEMAP_PROBE_RETRIES=2
CASEMAP_LOG=warn
"#;

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub path: Option<PathBuf>,
    pub force: bool,
}

fn write_sample(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, SAMPLE_ENV).with_context(|| format!("failed to write {}", path.display()))
}

pub fn run(opts: &InitOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("init");

    let target = opts
        .path
        .clone()
        .unwrap_or_else(|| paths.casemap_home.join(".env.example"));

    if target.exists() && !opts.force {
        report.issue(format!(
            "{} already exists; pass --force to overwrite",
            target.display()
        ));
    } else {
        write_sample(&target)?;
        report.detail(format!("sample environment file created: {}", target.display()));
        report.detail("copy it to .env and fill in the values");
    }

    record_audit(&paths, &report);
    Ok(report)
}
