//! Transient records that flow between the pipeline stages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::{IngestionError, Result};

/// Ordered string-keyed metadata. Insertion order survives serialisation.
pub type Metadata = serde_json::Map<String, Value>;

/// UTC format used for `cleaned_at` and `collected_at` stamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp_now() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// The closed set of origins a record can come from. Stored as `metadata.source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "wikipedia")]
    Wikipedia,
    #[serde(rename = "pubmed")]
    PubMed,
    #[serde(rename = "file_upload")]
    FileUpload,
    #[serde(rename = "video_script")]
    VideoScript,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Wikipedia => "wikipedia",
            SourceKind::PubMed => "pubmed",
            SourceKind::FileUpload => "file_upload",
            SourceKind::VideoScript => "video_script",
        }
    }

    /// Case-insensitive lookup of a `metadata.source` tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "wikipedia" => Some(SourceKind::Wikipedia),
            "pubmed" => Some(SourceKind::PubMed),
            "file_upload" => Some(SourceKind::FileUpload),
            "video_script" => Some(SourceKind::VideoScript),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Txt => "txt",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            "txt" => Some(FileType::Txt),
            _ => None,
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text plus source-specific metadata, as produced by an extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ExtractionResult {
    pub fn new(content: impl Into<String>, source: SourceKind) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), Value::from(source.as_str()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            content: String::new(),
            metadata,
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Builds a record from loosely-shaped JSON. Missing `content`/`metadata` default
    /// to empty; anything that is not an object, or carries wrongly typed fields, is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(IngestionError::Cleaning(format!(
                "expected a record object, got {}",
                json_kind(&value)
            )));
        };

        let content = match map.remove("content") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(IngestionError::Cleaning(format!(
                    "content must be a string, got {}",
                    json_kind(&other)
                )))
            }
        };

        let metadata = match map.remove("metadata") {
            None | Some(Value::Null) => Metadata::new(),
            Some(Value::Object(m)) => m,
            Some(other) => {
                return Err(IngestionError::Cleaning(format!(
                    "metadata must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(Self { content, metadata })
    }
}

/// Output of a cleaner: transformed content and stamped metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedResult {
    pub content: String,
    pub metadata: Metadata,
}

impl CleanedResult {
    pub fn is_cleaned(&self) -> bool {
        self.metadata.get("cleaned").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Topics recorded under `metadata.scientific_topics`, in stored order.
    pub fn scientific_topics(&self) -> Vec<String> {
        self.metadata
            .get("scientific_topics")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Hands the cleaned record back as an extraction-shaped input, for re-cleaning.
    pub fn into_extraction(self) -> ExtractionResult {
        ExtractionResult {
            content: self.content,
            metadata: self.metadata,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
