//! Uploaded document extraction (PDF, DOCX, TXT).

use serde_json::Value;
use tracing::{debug, instrument};

use super::{docx, pdf, txt};
use crate::error::{IngestionError, Result, ValidationError};
use crate::models::{ExtractionResult, FileType, SourceKind};

pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Rejects empty and oversized uploads before any parser sees them.
pub fn validate_file(filename: &str, bytes: &[u8], max_size: usize) -> std::result::Result<(), ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptyFile {
            filename: filename.to_string(),
        });
    }
    if bytes.len() > max_size {
        return Err(ValidationError::FileTooLarge {
            filename: filename.to_string(),
            size: bytes.len(),
            max: max_size,
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FileExtractor {
    max_file_size: usize,
}

impl Default for FileExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl FileExtractor {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn extract(
        &self,
        file_type: FileType,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ExtractionResult> {
        validate_file(filename, &bytes, self.max_file_size)?;
        let size = bytes.len();

        let (content, mut record) = match file_type {
            FileType::Pdf => {
                let parsed = tokio::task::spawn_blocking(move || pdf::parse_pdf(&bytes))
                    .await
                    .map_err(|e| parse_failure("PDF parser task failed", e))?
                    .map_err(|e| parse_failure("malformed PDF", e))?;
                debug!(pages = parsed.page_count, "Parsed PDF");
                let record = ExtractionResult::with_metadata(parsed.info)
                    .with_meta("page_count", parsed.page_count)
                    .with_meta("extraction_method", "lopdf");
                (parsed.text, record)
            }
            FileType::Docx => {
                let parsed = tokio::task::spawn_blocking(move || docx::parse_docx(&bytes))
                    .await
                    .map_err(|e| parse_failure("DOCX parser task failed", e))?
                    .map_err(|e| parse_failure("malformed DOCX", e))?;
                debug!(
                    paragraphs = parsed.paragraph_count,
                    cells = parsed.table_cell_count,
                    "Parsed DOCX"
                );
                let record = ExtractionResult::with_metadata(parsed.properties)
                    .with_meta("extraction_method", "ooxml");
                (parsed.text, record)
            }
            FileType::Txt => {
                let (text, encoding) = txt::decode_text(&bytes);
                let record = ExtractionResult::default()
                    .with_meta("encoding", encoding)
                    .with_meta("extraction_method", "plain-text");
                (text, record)
            }
        };

        record.content = content;
        record
            .metadata
            .insert("source".into(), Value::from(SourceKind::FileUpload.as_str()));
        record.metadata.insert("file_type".into(), Value::from(file_type.as_str()));
        record.metadata.insert("filename".into(), Value::from(filename));
        record.metadata.insert("size_bytes".into(), Value::from(size));
        Ok(record)
    }
}

fn parse_failure(
    message: &str,
    cause: impl std::error::Error + Send + Sync + 'static,
) -> IngestionError {
    IngestionError::extraction_with(SourceKind::FileUpload, message, cause)
}
