use thiserror::Error;

#[derive(Debug, Error)]
pub enum CasemapError {
    #[error("config invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("source snapshot unavailable: {0}")]
    SourceUnavailable(String),
    #[error("blob store unusable: {0}")]
    StoreUnavailable(String),
}

impl CasemapError {
    pub fn code(&self) -> CasemapErrorCode {
        match self {
            Self::InvalidConfig(_) => CasemapErrorCode::E001ConfigInvalid,
            Self::SourceUnavailable(_) => CasemapErrorCode::E002SourceUnavailable,
            Self::StoreUnavailable(_) => CasemapErrorCode::E003StoreUnavailable,
        }
    }
}

/// A single failed store request. Callers in the resolver treat this as a
/// miss for that one probe.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl StoreError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidRequest(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasemapErrorCode {
    E001ConfigInvalid,
    E002SourceUnavailable,
    E003StoreUnavailable,
    E004StoreDegraded,
}

impl CasemapErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001ConfigInvalid => "E001_CONFIG_INVALID",
            Self::E002SourceUnavailable => "E002_SOURCE_UNAVAILABLE",
            Self::E003StoreUnavailable => "E003_STORE_UNAVAILABLE",
            Self::E004StoreDegraded => "E004_STORE_DEGRADED",
        }
    }
}
