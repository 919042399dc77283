use scriptorium_common::ScriptoriumError;
use thiserror::Error;

use crate::models::SourceKind;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Precondition failures detected before any parsing starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File '{filename}' is empty")]
    EmptyFile { filename: String },

    #[error("File '{filename}' is {size} bytes, above the {max} byte limit")]
    FileTooLarge { filename: String, size: usize, max: usize },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{source_kind} extraction failed: {message}")]
    Extraction {
        source_kind: SourceKind,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Cleaning error: {0}")]
    Cleaning(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Publish error: {0}")]
    Publish(String),
}

impl IngestionError {
    pub fn extraction(source_kind: SourceKind, message: impl Into<String>) -> Self {
        IngestionError::Extraction {
            source_kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn extraction_with(
        source_kind: SourceKind,
        message: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> Self {
        IngestionError::Extraction {
            source_kind,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// Only transport failures during extraction are worth a retry, and only by the caller.
    pub fn is_retryable(&self) -> bool {
        let IngestionError::Extraction { cause: Some(cause), .. } = self else {
            return false;
        };
        if let Some(e) = cause.downcast_ref::<ScriptoriumError>() {
            return e.is_transient();
        }
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_timeout() || e.is_connect();
        }
        false
    }
}

pub type Result<T> = std::result::Result<T, IngestionError>;
