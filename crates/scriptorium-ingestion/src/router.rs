//! Maps a source descriptor to its extractor variant and cleaner.

use crate::cleaners::Cleaner;
use crate::error::{IngestionError, Result};
use crate::extractors::{pubmed, wikipedia};
use crate::models::{FileType, SourceKind};

/// What the caller knows about an input before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDescriptor<'a> {
    Url(&'a str),
    /// Routed by the filename's extension.
    File(&'a str),
    Script,
}

/// The closed set of extraction paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Wikipedia,
    PubMed,
    Pdf,
    Docx,
    Txt,
    Script,
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::Wikipedia => "wikipedia",
            Source::PubMed => "pubmed",
            Source::Pdf => "pdf",
            Source::Docx => "docx",
            Source::Txt => "txt",
            Source::Script => "script",
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Wikipedia => SourceKind::Wikipedia,
            Source::PubMed => SourceKind::PubMed,
            Source::Pdf | Source::Docx | Source::Txt => SourceKind::FileUpload,
            Source::Script => SourceKind::VideoScript,
        }
    }

    pub fn file_type(&self) -> Option<FileType> {
        match self {
            Source::Pdf => Some(FileType::Pdf),
            Source::Docx => Some(FileType::Docx),
            Source::Txt => Some(FileType::Txt),
            _ => None,
        }
    }

    pub fn cleaner(&self) -> Cleaner {
        match self {
            Source::Wikipedia => Cleaner::Wikipedia,
            Source::PubMed => Cleaner::PubMed,
            Source::Pdf => Cleaner::File(FileType::Pdf),
            Source::Docx => Cleaner::File(FileType::Docx),
            Source::Txt => Cleaner::File(FileType::Txt),
            Source::Script => Cleaner::Default,
        }
    }
}

impl From<FileType> for Source {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::Pdf => Source::Pdf,
            FileType::Docx => Source::Docx,
            FileType::Txt => Source::Txt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub source: Source,
    pub cleaner: Cleaner,
}

/// First match wins: Wikipedia URL, PubMed article URL, known file extension, script.
pub fn route(descriptor: SourceDescriptor<'_>) -> Result<Route> {
    let source = match descriptor {
        SourceDescriptor::Url(url) if wikipedia::is_wikipedia_url(url) => Source::Wikipedia,
        SourceDescriptor::Url(url) if pubmed::is_pubmed_url(url) => Source::PubMed,
        SourceDescriptor::Url(url) => return Err(IngestionError::UnsupportedSource(url.to_string())),
        SourceDescriptor::File(filename) => match FileType::from_filename(filename) {
            Some(file_type) => file_type.into(),
            None => return Err(IngestionError::UnsupportedSource(filename.to_string())),
        },
        SourceDescriptor::Script => Source::Script,
    };
    Ok(Route {
        source,
        cleaner: source.cleaner(),
    })
}
