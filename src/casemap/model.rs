use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A legacy case/matter as exported from the source database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    #[serde(alias = "project_name")]
    pub name: String,
}

/// A legacy document row. Only `id` is guaranteed; every other column may
/// be null in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

impl Document {
    /// The filename this document contributes to path resolution, if any.
    ///
    /// A document qualifies only when it references a project and carries a
    /// filename that is not blank.
    pub fn qualifying_filename(&self) -> Option<&str> {
        self.project_id?;
        self.filename
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    pub fn is_qualifying(&self) -> bool {
        self.qualifying_filename().is_some()
    }
}

/// Resolved storage prefix per project id.
pub type PathMapping = BTreeMap<i64, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingStats {
    pub total_projects_mapped: usize,
    pub unique_paths: usize,
}

impl MappingStats {
    pub fn from_mapping(mapping: &PathMapping) -> Self {
        let unique: BTreeSet<&str> = mapping.values().map(String::as_str).collect();
        Self {
            total_projects_mapped: mapping.len(),
            unique_paths: unique.len(),
        }
    }
}
