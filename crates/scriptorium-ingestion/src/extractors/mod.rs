//! Source extractors: raw input in, `{content, metadata}` out.

pub mod docx;
pub mod file;
pub mod pdf;
pub mod pubmed;
pub mod script;
pub mod txt;
pub mod wikipedia;

use crate::error::{Result, ValidationError};
use crate::models::{ExtractionResult, FileType};
use crate::router::Source;

pub use file::{validate_file, FileExtractor};
pub use pubmed::PubMedExtractor;
pub use script::ScriptExtractor;
pub use wikipedia::{RelatedArticle, WikipediaExtractor};

/// Raw input handed to an extractor.
#[derive(Debug, Clone)]
pub enum SourceInput {
    Url(String),
    File { filename: String, bytes: Vec<u8> },
    Text(String),
}

impl SourceInput {
    fn kind(&self) -> &'static str {
        match self {
            SourceInput::Url(_) => "a URL",
            SourceInput::File { .. } => "a file",
            SourceInput::Text(_) => "text",
        }
    }
}

/// One extractor per source variant. Immutable after construction, so a single
/// instance can serve any number of concurrent extractions.
#[derive(Debug, Clone)]
pub struct ExtractorSet {
    wikipedia: WikipediaExtractor,
    pubmed: PubMedExtractor,
    files: FileExtractor,
    script: ScriptExtractor,
}

impl ExtractorSet {
    pub fn new(wikipedia: WikipediaExtractor, pubmed: PubMedExtractor, files: FileExtractor) -> Self {
        Self {
            wikipedia,
            pubmed,
            files,
            script: ScriptExtractor,
        }
    }

    pub fn wikipedia(&self) -> &WikipediaExtractor {
        &self.wikipedia
    }

    pub async fn extract(&self, source: Source, input: SourceInput) -> Result<ExtractionResult> {
        match (source, input) {
            (Source::Wikipedia, SourceInput::Url(url)) => self.wikipedia.extract(&url).await,
            (Source::PubMed, SourceInput::Url(url)) => self.pubmed.extract(&url).await,
            (Source::Pdf, SourceInput::File { filename, bytes }) => {
                self.files.extract(FileType::Pdf, &filename, bytes).await
            }
            (Source::Docx, SourceInput::File { filename, bytes }) => {
                self.files.extract(FileType::Docx, &filename, bytes).await
            }
            (Source::Txt, SourceInput::File { filename, bytes }) => {
                self.files.extract(FileType::Txt, &filename, bytes).await
            }
            (Source::Script, SourceInput::Text(script)) => Ok(self.script.extract(&script)),
            (source, input) => Err(ValidationError::InvalidInput(format!(
                "{} extractor cannot take {}",
                source.name(),
                input.kind()
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestionError;
    use scriptorium_common::SandboxClient;

    fn extractors() -> ExtractorSet {
        let client = SandboxClient::new().unwrap();
        ExtractorSet::new(
            WikipediaExtractor::new(client.clone()),
            PubMedExtractor::new(client),
            FileExtractor::new(1024),
        )
    }

    #[tokio::test]
    async fn test_script_requires_text_input() {
        let err = extractors()
            .extract(Source::Script, SourceInput::Url("https://en.wikipedia.org/wiki/DNA".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestionError::Validation(ValidationError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_txt_dispatch() {
        let rec = extractors()
            .extract(
                Source::Txt,
                SourceInput::File {
                    filename: "a.txt".into(),
                    bytes: b"  hello  ".to_vec(),
                },
            )
            .await
            .unwrap();
        assert_eq!(rec.content, "  hello  ");
        assert_eq!(rec.metadata["file_type"], "txt");
    }
}
