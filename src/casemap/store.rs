use crate::casemap::config::StoreConfig;
use crate::error::{CasemapError, StoreError};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::ops::Bound;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Read-only view of the object store holding migrated document blobs.
///
/// Implementations are shared across reconcile workers, so they must be
/// thread-safe. Every call may be a network round-trip.
pub trait BlobStore: Send + Sync {
    /// True when at least one object key starts with `prefix`.
    fn prefix_exists(&self, prefix: &str) -> Result<bool, StoreError>;

    /// True when an object with exactly this key exists.
    fn object_exists(&self, key: &str) -> Result<bool, StoreError>;

    fn describe(&self) -> String;
}

const RETRY_BACKOFF_MS: u64 = 250;

/// Backoff before the next attempt, or `None` when the error is final.
/// `attempt` counts retries already made.
fn retry_delay(err: &StoreError, attempt: usize, retries: usize) -> Option<Duration> {
    if !err.is_retryable() || attempt >= retries {
        return None;
    }
    Some(Duration::from_millis(RETRY_BACKOFF_MS * (attempt as u64 + 1)))
}

/// Object lookups answer 404 for a missing key; listings never should.
fn status_accepted(status: StatusCode, accept_not_found: bool) -> bool {
    status.is_success() || (accept_not_found && status == StatusCode::NOT_FOUND)
}

/// Google Cloud Storage through the JSON API.
pub struct GcsStore {
    client: Client,
    endpoint: String,
    bucket: String,
    project_id: String,
    access_token: Option<String>,
    retries: usize,
}

impl GcsStore {
    pub fn new(cfg: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("failed to build storage http client")?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            bucket: cfg.bucket_name.clone(),
            project_id: cfg.project_id.clone(),
            access_token: cfg.access_token.clone(),
            retries: cfg.probe_retries,
        })
    }

    fn objects_url(&self, object: Option<&str>) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|err| StoreError::InvalidRequest(format!("bad endpoint: {err}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidRequest("endpoint cannot be a base".into()))?;
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", self.bucket.as_str(), "o"]);
            // `push` percent-encodes `/`, which the object endpoint requires.
            if let Some(name) = object {
                segments.push(name);
            }
        }
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn send_with_retry(
        &self,
        url: &Url,
        build: impl Fn() -> RequestBuilder,
        accept_not_found: bool,
    ) -> Result<Response, StoreError> {
        let mut attempt = 0usize;
        loop {
            let outcome = self
                .authorize(build())
                .send()
                .map_err(|source| StoreError::Transport {
                    url: url.to_string(),
                    source,
                })
                .and_then(|resp| {
                    let status = resp.status();
                    if status_accepted(status, accept_not_found) {
                        Ok(resp)
                    } else {
                        Err(StoreError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        })
                    }
                });

            let err = match outcome {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };
            let Some(delay) = retry_delay(&err, attempt, self.retries) else {
                return Err(err);
            };
            attempt += 1;
            debug!(%url, attempt, error = %err, "retrying storage request");
            thread::sleep(delay);
        }
    }
}

impl BlobStore for GcsStore {
    fn prefix_exists(&self, prefix: &str) -> Result<bool, StoreError> {
        let url = self.objects_url(None)?;
        let resp = self.send_with_retry(
            &url,
            || {
                self.client.get(url.clone()).query(&[
                    ("prefix", prefix),
                    ("maxResults", "1"),
                    ("fields", "items(name)"),
                ])
            },
            false,
        )?;
        let body: Value = resp.json().map_err(|source| StoreError::Transport {
            url: url.to_string(),
            source,
        })?;
        Ok(body
            .get("items")
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty()))
    }

    fn object_exists(&self, key: &str) -> Result<bool, StoreError> {
        let url = self.objects_url(Some(key))?;
        let resp = self.send_with_retry(
            &url,
            || self.client.get(url.clone()).query(&[("fields", "name")]),
            true,
        )?;
        Ok(resp.status() != StatusCode::NOT_FOUND)
    }

    fn describe(&self) -> String {
        format!("gcs bucket={} project={}", self.bucket, self.project_id)
    }
}

/// Object keys from a saved bucket listing, held in memory.
#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
    keys: BTreeSet<String>,
    source: String,
}

fn normalize_listing_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    // `gsutil ls -r` style: drop the scheme and bucket name.
    let key = match trimmed.strip_prefix("gs://") {
        Some(rest) => rest.split_once('/').map(|(_, key)| key)?,
        None => trimmed,
    };
    if key.is_empty() || key.ends_with(':') {
        return None;
    }
    Some(key.to_string())
}

impl ManifestStore {
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            source: "inline".to_string(),
        }
    }

    pub fn from_listing(raw: &str) -> Self {
        Self::from_keys(raw.lines().filter_map(normalize_listing_line))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let mut store = Self::from_listing(&raw);
        store.source = path.display().to_string();
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

impl BlobStore for ManifestStore {
    fn prefix_exists(&self, prefix: &str) -> Result<bool, StoreError> {
        Ok(self
            .keys
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .next()
            .is_some_and(|key| key.starts_with(prefix)))
    }

    fn object_exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.keys.contains(key))
    }

    fn describe(&self) -> String {
        format!("manifest source={} keys={}", self.source, self.len())
    }
}

/// Build the store selected by `cfg.backend`.
pub fn open_store(cfg: &StoreConfig) -> Result<Box<dyn BlobStore>> {
    match cfg.backend.as_str() {
        "gcs" => {
            let store = GcsStore::new(cfg)
                .map_err(|err| CasemapError::StoreUnavailable(format!("{err:#}")))?;
            Ok(Box::new(store))
        }
        "manifest" => {
            let path = cfg
                .manifest_path
                .as_deref()
                .ok_or_else(|| CasemapError::InvalidConfig("manifest path not set".into()))?;
            let store = ManifestStore::load(Path::new(path))
                .map_err(|err| CasemapError::StoreUnavailable(format!("{err:#}")))?;
            Ok(Box::new(store))
        }
        other => Err(CasemapError::InvalidConfig(format!("unknown store backend `{other}`")).into()),
    }
}
