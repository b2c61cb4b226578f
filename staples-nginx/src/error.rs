use reqwest::StatusCode;

/// Errors that abort a collection cycle.
///
/// Per-node anomalies met while flattening (null values, failed reverse
/// lookups) are never surfaced here; they are logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("{0} config required, check the plugin configuration")]
    MissingConfig(String),
    #[error("invalid {key} config: {reason}")]
    InvalidConfig { key: String, reason: String },
    #[error("request to nginx server failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("nginx server answered with status {status}")]
    RequestFailed { status: StatusCode },
    #[error("nginx status document could not be decoded: {0}")]
    Decode(String),
}

impl CollectError {
    pub(crate) fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        CollectError::InvalidConfig {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
