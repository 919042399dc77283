//! Extract → tag → clean → assemble, for one input at a time.
//!
//! The pipeline owns no mutable state: a single instance can be shared behind
//! an `Arc` and driven concurrently. It builds a [`CollectionDraft`] and stops
//! there; persistence and publishing belong to the service layer.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use scriptorium_common::sandbox::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use scriptorium_common::SandboxClient;

use crate::cleaners::Cleaner;
use crate::collection::CollectionDraft;
use crate::error::{IngestionError, Result};
use crate::extractors::file::DEFAULT_MAX_FILE_SIZE;
use crate::extractors::{ExtractorSet, FileExtractor, PubMedExtractor, SourceInput, WikipediaExtractor};
use crate::models::{timestamp_now, CleanedResult, ExtractionResult};
use crate::router::{self, Route, SourceDescriptor};
use crate::topics::extract_topics;

pub const DEFAULT_URL_TITLE: &str = "Article";
pub const DEFAULT_SCRIPT_TITLE: &str = "Video Script";

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Upper bound for uploaded files, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Scrape the rendered page when the Wikipedia extracts API fails.
    #[serde(default = "default_true")]
    pub wikipedia_html_fallback: bool,
    #[serde(default = "default_related_articles_limit")]
    pub related_articles_limit: usize,
    /// Mirror serving `/w/api.php` and `/wiki/...` in place of wikipedia.org.
    #[serde(default)]
    pub wikipedia_base_url: Option<String>,
    /// Mirror serving `/{pmid}/` article pages in place of PubMed.
    #[serde(default)]
    pub pubmed_base_url: Option<String>,
}

fn default_max_file_size() -> usize {
    DEFAULT_MAX_FILE_SIZE
}
fn default_http_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_true() -> bool {
    true
}
fn default_related_articles_limit() -> usize {
    5
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            http_timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
            wikipedia_html_fallback: true,
            related_articles_limit: default_related_articles_limit(),
            wikipedia_base_url: None,
            pubmed_base_url: None,
        }
    }
}

// ── Requests ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum IngestRequest {
    Url(String),
    File { filename: String, bytes: Vec<u8> },
    Script { content: String, title: Option<String> },
}

impl IngestRequest {
    pub fn descriptor(&self) -> SourceDescriptor<'_> {
        match self {
            IngestRequest::Url(url) => SourceDescriptor::Url(url),
            IngestRequest::File { filename, .. } => SourceDescriptor::File(filename),
            IngestRequest::Script { .. } => SourceDescriptor::Script,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            IngestRequest::Url(_) => "url",
            IngestRequest::File { .. } => "file",
            IngestRequest::Script { .. } => "script",
        }
    }

    fn split(self) -> (SourceInput, Origin) {
        match self {
            IngestRequest::Url(url) => (SourceInput::Url(url.clone()), Origin::Url(url)),
            IngestRequest::File { filename, bytes } => (
                SourceInput::File {
                    filename: filename.clone(),
                    bytes,
                },
                Origin::File(filename),
            ),
            IngestRequest::Script { content, title } => (SourceInput::Text(content), Origin::Script(title)),
        }
    }
}

/// What is left of the request once its payload has gone to the extractor.
/// Drives the title and url of the assembled record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Url(String),
    File(String),
    Script(Option<String>),
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    extractors: ExtractorSet,
}

impl IngestionPipeline {
    pub fn new(config: &IngestionConfig) -> scriptorium_common::Result<Self> {
        let client = SandboxClient::with_settings(
            Duration::from_secs(config.http_timeout_secs),
            &config.user_agent,
        )?;
        Ok(Self::with_client(client, config))
    }

    /// Mirror hosts named in `config` are added to the client's allowlist.
    pub fn with_client(mut client: SandboxClient, config: &IngestionConfig) -> Self {
        for base in [&config.wikipedia_base_url, &config.pubmed_base_url].into_iter().flatten() {
            allow_mirror(&mut client, base);
        }

        let mut wikipedia =
            WikipediaExtractor::new(client.clone()).with_html_fallback(config.wikipedia_html_fallback);
        if let Some(base) = &config.wikipedia_base_url {
            wikipedia = wikipedia.with_base_url(base.as_str());
        }
        let mut pubmed = PubMedExtractor::new(client);
        if let Some(base) = &config.pubmed_base_url {
            pubmed = pubmed.with_base_url(base.as_str());
        }

        Self {
            extractors: ExtractorSet::new(wikipedia, pubmed, FileExtractor::new(config.max_file_size)),
        }
    }

    pub fn extractors(&self) -> &ExtractorSet {
        &self.extractors
    }

    #[instrument(skip(self, request), fields(kind = request.kind()))]
    pub async fn run(&self, request: IngestRequest) -> Result<CollectionDraft> {
        let route = router::route(request.descriptor())?;
        debug!(source = route.source.name(), cleaner = route.cleaner.name(), "Routed input");

        let (input, origin) = request.split();
        let extracted = self.extractors.extract(route.source, input).await?;
        let extracted_len = extracted.content.len();

        let cleaned = process(route, extracted)?;
        let draft = assemble(cleaned, origin);

        info!(
            source = route.source.name(),
            extracted_len,
            cleaned_len = draft.content.len(),
            topics = draft.scientific_topics.len(),
            "Built collection draft"
        );
        Ok(draft)
    }
}

fn allow_mirror(client: &mut SandboxClient, base: &str) {
    match reqwest::Url::parse(base).ok().and_then(|u| u.host_str().map(str::to_string)) {
        Some(host) => {
            info!(base, "Routing source requests through mirror");
            client.allow_domain(&host);
        }
        None => warn!(base, "Ignoring mirror URL without a host"),
    }
}

// ── Stages ────────────────────────────────────────────────────────────────────

/// Writes the sorted topic set for the record's content into its metadata.
pub fn tag_topics(record: &mut ExtractionResult) {
    let topics: Vec<Value> = extract_topics(&record.content)
        .into_iter()
        .map(Value::String)
        .collect();
    record
        .metadata
        .insert("scientific_topics".into(), Value::Array(topics));
}

/// Tags and cleans an extracted record. The cleaner named by the record's own
/// metadata must agree with the route, otherwise the extractor produced a
/// record for the wrong source.
pub fn process(route: Route, mut extracted: ExtractionResult) -> Result<CleanedResult> {
    let cleaner = Cleaner::for_metadata(&extracted.metadata)?;
    if cleaner != route.cleaner {
        return Err(IngestionError::Cleaning(format!(
            "{} extractor produced a record for the {} cleaner",
            route.source.name(),
            cleaner.name()
        )));
    }

    tag_topics(&mut extracted);
    let mut cleaned = cleaner.clean(extracted);
    cleaned
        .metadata
        .insert("collected_at".into(), Value::String(timestamp_now()));
    Ok(cleaned)
}

/// Builds the storable record from a cleaned result.
pub fn assemble(cleaned: CleanedResult, origin: Origin) -> CollectionDraft {
    let scientific_topics = cleaned.scientific_topics();
    let metadata_title = cleaned
        .metadata
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let (title, url) = match origin {
        Origin::Url(url) => (
            metadata_title.unwrap_or_else(|| DEFAULT_URL_TITLE.to_string()),
            Some(url),
        ),
        Origin::File(filename) => (metadata_title.unwrap_or_else(|| file_stem(&filename)), None),
        Origin::Script(title) => (
            title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_SCRIPT_TITLE.to_string()),
            None,
        ),
    };

    let now = Utc::now();
    CollectionDraft {
        title,
        content: cleaned.content,
        url,
        scientific_topics,
        metadata: cleaned.metadata,
        created_at: now,
        updated_at: now,
    }
}

fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(filename)
        .to_string()
}
