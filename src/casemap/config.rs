use crate::error::CasemapError;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: String,
    pub bucket_name: String,
    pub project_id: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub manifest_path: Option<String>,
    pub request_timeout_secs: u64,
    pub probe_retries: usize,
}

fn default_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "gcs".to_string(),
            bucket_name: "bennett_bucket1".to_string(),
            project_id: "dataengineerng".to_string(),
            endpoint: default_endpoint(),
            access_token: None,
            manifest_path: None,
            request_timeout_secs: 20,
            probe_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub root: String,
    pub fallback_folder: String,
    pub variant_prefixes: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root: "docs/Bennett Legal".to_string(),
            fallback_folder: "zzz_mailroom_no_project_assigned".to_string(),
            variant_prefixes: vec!["Solar - ".to_string(), "Solar - PNC ".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub max_concurrent: usize,
    pub fallback_sample_size: usize,
    /// Opt-in: probe `<candidate>/` so `Foo` does not match `Foo (2)/x.pdf`.
    /// Off by default, where any key starting with the candidate counts.
    #[serde(default = "default_folder_boundary")]
    pub folder_boundary: bool,
}

fn default_folder_boundary() -> bool {
    false
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            fallback_sample_size: 3,
            folder_boundary: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CasemapConfig {
    pub store: StoreConfig,
    pub layout: LayoutConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialCasemapConfig {
    store: Option<StoreConfig>,
    layout: Option<LayoutConfig>,
    run: Option<RunConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_optional(var: &str, fallback: Option<String>) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => fallback,
    }
}

// Prefixes keep their trailing space, so only empty entries are dropped.
fn env_or_list(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split('|')
                .filter(|s| !s.trim().is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

pub fn validate(cfg: &CasemapConfig) -> Result<()> {
    if cfg.store.bucket_name.trim().is_empty() {
        return Err(anyhow!("invalid store: bucket name cannot be empty"));
    }
    match cfg.store.backend.as_str() {
        "gcs" => {
            if cfg.store.endpoint.trim().is_empty() {
                return Err(anyhow!("invalid store: endpoint cannot be empty"));
            }
        }
        "manifest" => {
            let missing = cfg
                .store
                .manifest_path
                .as_deref()
                .is_none_or(|p| p.trim().is_empty());
            if missing {
                return Err(anyhow!(
                    "invalid store: manifest backend requires CASEMAP_STORE_MANIFEST"
                ));
            }
        }
        other => {
            return Err(anyhow!(
                "invalid store backend `{other}`: use `gcs` or `manifest`"
            ));
        }
    }
    if cfg.store.request_timeout_secs == 0 {
        return Err(anyhow!("invalid request timeout: must be >= 1 second"));
    }
    if cfg.layout.root.trim_matches('/').trim().is_empty() {
        return Err(anyhow!("invalid layout root: cannot be empty"));
    }
    let fallback = cfg.layout.fallback_folder.trim();
    if fallback.is_empty() || fallback.contains('/') {
        return Err(anyhow!(
            "invalid fallback folder: must be a single non-empty path segment"
        ));
    }
    if cfg.run.max_concurrent == 0 {
        return Err(anyhow!("invalid max concurrent: must be >= 1"));
    }
    if cfg.run.fallback_sample_size == 0 {
        return Err(anyhow!("invalid fallback sample size: must be >= 1"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("CASEMAP_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".casemap").join("casemap.toml"))
}

fn merge_file_config(base: &mut CasemapConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialCasemapConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse casemap config {}: {err}", path.display()))?;
    if let Some(store) = parsed.store {
        base.store = store;
    }
    if let Some(layout) = parsed.layout {
        base.layout = layout;
    }
    if let Some(run) = parsed.run {
        base.run = run;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut CasemapConfig) {
    cfg.store.backend = env_or_string("CASEMAP_STORE_BACKEND", &cfg.store.backend);
    cfg.store.bucket_name = env_or_string("GCS_BUCKET_NAME", &cfg.store.bucket_name);
    cfg.store.project_id = env_or_string("GCS_PROJECT_ID", &cfg.store.project_id);
    cfg.store.endpoint = env_or_string("CASEMAP_GCS_ENDPOINT", &cfg.store.endpoint);
    cfg.store.access_token = env_or_optional("GCS_ACCESS_TOKEN", cfg.store.access_token.take());
    cfg.store.manifest_path =
        env_or_optional("CASEMAP_STORE_MANIFEST", cfg.store.manifest_path.take());
    cfg.store.request_timeout_secs = env_or_u64(
        "CASEMAP_REQUEST_TIMEOUT_SECS",
        cfg.store.request_timeout_secs,
    );
    cfg.store.probe_retries = env_or_usize("CASEMAP_PROBE_RETRIES", cfg.store.probe_retries);

    cfg.layout.root = env_or_string("CASEMAP_ROOT_PREFIX", &cfg.layout.root);
    cfg.layout.fallback_folder =
        env_or_string("CASEMAP_FALLBACK_FOLDER", &cfg.layout.fallback_folder);
    cfg.layout.variant_prefixes =
        env_or_list("CASEMAP_VARIANT_PREFIXES", &cfg.layout.variant_prefixes);

    cfg.run.max_concurrent = env_or_usize("MIGRATION_MAX_CONCURRENT", cfg.run.max_concurrent);
    cfg.run.fallback_sample_size = env_or_usize(
        "CASEMAP_FALLBACK_SAMPLE_SIZE",
        cfg.run.fallback_sample_size,
    );
    cfg.run.folder_boundary = env_or_bool("CASEMAP_FOLDER_BOUNDARY", cfg.run.folder_boundary);
}

pub fn load_config() -> Result<CasemapConfig> {
    let mut cfg = CasemapConfig::default();
    merge_file_config(&mut cfg)
        .map_err(|err| CasemapError::InvalidConfig(format!("{err:#}")))?;
    apply_env_overrides(&mut cfg);
    validate(&cfg).map_err(|err| CasemapError::InvalidConfig(err.to_string()))?;
    Ok(cfg)
}
