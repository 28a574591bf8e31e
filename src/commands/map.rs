use anyhow::Result;
use std::path::PathBuf;

use crate::casemap::mapping_file::MappingFile;
use crate::commands::{CommandReport, load_inputs, reconcile, record_audit, summarize};

#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    pub out: Option<PathBuf>,
    pub dry_run: bool,
}

pub fn run(opts: &MapOptions) -> Result<CommandReport> {
    let inputs = load_inputs()?;
    let mut report = CommandReport::new("map");

    let result = reconcile(&inputs, &mut report)?;
    summarize(&mut report, &result);
    report.detail(format!("digest={}", result.digest()));

    if opts.dry_run {
        report.detail("dry-run: mapping file not written");
    } else if result.store_degraded() {
        report.detail("mapping file not written: store degraded");
    } else {
        let out = opts
            .out
            .clone()
            .unwrap_or_else(|| inputs.paths.default_mapping_file());
        MappingFile::from_report(
            &result,
            &inputs.config.store.bucket_name,
            &inputs.config.layout.root,
        )?
        .save(&out)?;
        report.detail(format!("mapping_file={}", out.display()));
    }

    record_audit(&inputs.paths, &report);
    Ok(report)
}
