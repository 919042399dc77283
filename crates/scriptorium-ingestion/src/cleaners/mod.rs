//! Source-specific content normalisation.
//!
//! Every cleaner runs its own transform and then stamps `cleaned = true` and
//! `cleaned_at`. Transforms are pure string functions so each can be tested,
//! and re-applied, in isolation.

pub mod file;
pub mod protect;
pub mod pubmed;
pub mod wikipedia;

use serde_json::Value;
use tracing::debug;

use crate::error::{IngestionError, Result};
use crate::models::{timestamp_now, CleanedResult, ExtractionResult, FileType, Metadata, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleaner {
    /// Stamping only. Used for scripts.
    Default,
    Wikipedia,
    PubMed,
    File(FileType),
}

impl Cleaner {
    /// Picks the cleaner for a `(source, file_type)` pair. Unknown combinations fail.
    pub fn for_source(source: &str, file_type: Option<&str>) -> Result<Self> {
        match SourceKind::from_tag(source) {
            Some(SourceKind::Wikipedia) => Ok(Cleaner::Wikipedia),
            Some(SourceKind::PubMed) => Ok(Cleaner::PubMed),
            Some(SourceKind::VideoScript) => Ok(Cleaner::Default),
            Some(SourceKind::FileUpload) => file_type
                .and_then(FileType::from_extension)
                .map(Cleaner::File)
                .ok_or_else(|| {
                    IngestionError::UnsupportedSource(format!(
                        "file_upload with file type {}",
                        file_type.unwrap_or("<none>")
                    ))
                }),
            None => Err(IngestionError::UnsupportedSource(source.to_string())),
        }
    }

    /// Reads `source` and `file_type` out of a record's metadata.
    pub fn for_metadata(metadata: &Metadata) -> Result<Self> {
        let source = metadata.get("source").and_then(Value::as_str).unwrap_or_default();
        let file_type = metadata.get("file_type").and_then(Value::as_str);
        Self::for_source(source, file_type)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cleaner::Default => "default",
            Cleaner::Wikipedia => "wikipedia",
            Cleaner::PubMed => "pubmed",
            Cleaner::File(_) => "file",
        }
    }

    pub fn clean(&self, record: ExtractionResult) -> CleanedResult {
        let ExtractionResult { content, mut metadata } = record;
        let before = content.len();

        let content = match self {
            Cleaner::Default => content,
            Cleaner::Wikipedia => wikipedia::clean(&content, &mut metadata),
            Cleaner::PubMed => pubmed::clean_text(&content),
            Cleaner::File(file_type) => file::clean(&content, *file_type, &mut metadata),
        };

        metadata.insert("cleaned".into(), Value::Bool(true));
        metadata.insert("cleaned_at".into(), Value::String(timestamp_now()));

        debug!(cleaner = self.name(), before, after = content.len(), "Cleaned content");
        CleanedResult { content, metadata }
    }

    /// Cleans a loosely-shaped JSON record. Fails only when the shape itself is wrong.
    pub fn clean_value(&self, value: Value) -> Result<CleanedResult> {
        Ok(self.clean(ExtractionResult::from_value(value)?))
    }
}
