use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptoriumError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Security policy violation: {0}")]
    SecurityError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScriptoriumError {
    /// Transport-level failures (timeouts, refused connections) are worth retrying by the caller.
    pub fn is_transient(&self) -> bool {
        match self {
            ScriptoriumError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScriptoriumError>;
