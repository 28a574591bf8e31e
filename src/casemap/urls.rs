use crate::casemap::model::{Document, PathMapping};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const PUBLIC_HOST: &str = "https://storage.googleapis.com";

pub fn gcs_url(bucket: &str, path: &str, filename: &str) -> String {
    format!("gs://{bucket}/{path}/{filename}")
}

pub fn public_url(bucket: &str, path: &str, filename: &str) -> String {
    format!("{PUBLIC_HOST}/{bucket}/{path}/{filename}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentUrl {
    pub document_id: i64,
    pub project_id: i64,
    pub filename: String,
    pub gcs_url: String,
    pub public_url: String,
}

/// URLs for one document, or `None` when it has no usable filename or its
/// project is not in the mapping.
pub fn document_url(bucket: &str, mapping: &PathMapping, doc: &Document) -> Option<DocumentUrl> {
    let filename = doc.qualifying_filename()?;
    let project_id = doc.project_id?;
    let path = mapping.get(&project_id)?;
    Some(DocumentUrl {
        document_id: doc.id,
        project_id,
        filename: filename.to_string(),
        gcs_url: gcs_url(bucket, path, filename),
        public_url: public_url(bucket, path, filename),
    })
}

#[derive(Debug, Clone, Default)]
pub struct UrlBatch {
    pub urls: Vec<DocumentUrl>,
    pub qualifying: usize,
    pub without_mapping: usize,
}

pub fn build_document_urls(bucket: &str, mapping: &PathMapping, documents: &[Document]) -> UrlBatch {
    let mut batch = UrlBatch::default();
    for doc in documents.iter().filter(|d| d.is_qualifying()) {
        batch.qualifying += 1;
        match document_url(bucket, mapping, doc) {
            Some(url) => batch.urls.push(url),
            None => batch.without_mapping += 1,
        }
    }
    batch
}

pub fn write_csv(path: &Path, urls: &[DocumentUrl]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(["document_id", "project_id", "filename", "gcs_url", "public_url"])?;
    for url in urls {
        writer.write_record([
            url.document_id.to_string(),
            url.project_id.to_string(),
            url.filename.clone(),
            url.gcs_url.clone(),
            url.public_url.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(urls.len())
}
