use anyhow::Result;
use std::path::PathBuf;

use crate::casemap::mapping_file::MappingFile;
use crate::casemap::urls;
use crate::commands::{CommandReport, load_inputs, reconcile, record_audit, summarize};

#[derive(Debug, Clone, Default)]
pub struct UrlsOptions {
    /// Reuse a saved `map` result instead of probing the store again.
    pub mapping: Option<PathBuf>,
    pub out: Option<PathBuf>,
}

pub fn run(opts: &UrlsOptions) -> Result<CommandReport> {
    let inputs = load_inputs()?;
    let mut report = CommandReport::new("urls");

    let (bucket, mapping) = match &opts.mapping {
        Some(path) => {
            let saved = MappingFile::load(path)?;
            report.detail(format!("mapping_file={}", path.display()));
            report.detail(format!("digest={}", saved.digest));
            (saved.bucket, saved.mapping)
        }
        None => {
            let result = reconcile(&inputs, &mut report)?;
            summarize(&mut report, &result);
            if result.store_degraded() {
                record_audit(&inputs.paths, &report);
                return Ok(report);
            }
            (inputs.config.store.bucket_name.clone(), result.mapping)
        }
    };

    let batch = urls::build_document_urls(&bucket, &mapping, &inputs.documents);
    let out = opts
        .out
        .clone()
        .unwrap_or_else(|| inputs.paths.export_dir.join("document_urls.csv"));
    let written = urls::write_csv(&out, &batch.urls)?;

    report.detail(format!("qualifying_documents={}", batch.qualifying));
    report.detail(format!("documents_with_urls={written}"));
    report.detail(format!(
        "documents_without_mapping={}",
        batch.without_mapping
    ));
    report.detail(format!("urls_file={}", out.display()));

    record_audit(&inputs.paths, &report);
    Ok(report)
}
