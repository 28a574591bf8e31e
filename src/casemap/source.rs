use crate::casemap::model::{Document, Project};
use crate::error::CasemapError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Full snapshot access to the legacy database tables the reconciler needs.
pub trait SourceReader {
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn list_documents(&self) -> Result<Vec<Document>>;
}

/// Projects and documents exported from the legacy database as JSON arrays.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    pub projects_path: PathBuf,
    pub documents_path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(projects_path: impl Into<PathBuf>, documents_path: impl Into<PathBuf>) -> Self {
        Self {
            projects_path: projects_path.into(),
            documents_path: documents_path.into(),
        }
    }
}

fn read_json_array<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path).map_err(|err| {
        CasemapError::SourceUnavailable(format!("cannot read {what} {}: {err}", path.display()))
    })?;
    let rows: Vec<T> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {what} {}", path.display()))?;
    Ok(rows)
}

impl SourceReader for JsonSnapshotSource {
    fn list_projects(&self) -> Result<Vec<Project>> {
        read_json_array(&self.projects_path, "projects snapshot")
    }

    fn list_documents(&self) -> Result<Vec<Document>> {
        read_json_array(&self.documents_path, "documents snapshot")
    }
}
