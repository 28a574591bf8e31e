use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CasemapPaths {
    pub casemap_home: PathBuf,
    pub projects_file: PathBuf,
    pub documents_file: PathBuf,
    pub export_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl CasemapPaths {
    pub fn default_mapping_file(&self) -> PathBuf {
        self.export_dir.join("project_path_map.json")
    }
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<CasemapPaths> {
    let casemap_home = match env::var("CASEMAP_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join("casemap"),
    };

    let snapshot_dir = casemap_home.join("snapshot");
    let projects_file =
        env_or_default_path("CASEMAP_PROJECTS_FILE", snapshot_dir.join("projects.json"));
    let documents_file = env_or_default_path(
        "CASEMAP_DOCUMENTS_FILE",
        snapshot_dir.join("documents.json"),
    );
    let export_dir = env_or_default_path("CASEMAP_EXPORT_DIR", casemap_home.join("exports"));
    let logs_dir = env_or_default_path("CASEMAP_LOGS_DIR", casemap_home.join("logs"));

    Ok(CasemapPaths {
        casemap_home,
        projects_file,
        documents_file,
        export_dir,
        logs_dir,
    })
}
