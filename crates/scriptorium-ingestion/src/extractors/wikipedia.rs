//! Wikipedia article extraction.
//!
//! Plain text comes from the MediaWiki `extracts` API. If the API call fails or
//! returns nothing, the rendered article is fetched and the `<p>` elements of the
//! main content container are concatenated instead.

use regex::Regex;
use scraper::{Html, Selector};
use scriptorium_common::SandboxClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result, ValidationError};
use crate::models::{ExtractionResult, SourceKind};

pub const DEFAULT_LANGUAGE: &str = "en";

fn lazy_article_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://(www\.)?([a-z]{2}\.)?wikipedia\.org/wiki/.+").unwrap())
}

fn lazy_title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/wiki/([^?#]+)").unwrap())
}

fn lazy_language_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://([a-z]{2})\.wikipedia\.org/wiki/").unwrap())
}

fn lazy_paragraph_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("div#mw-content-text p").unwrap())
}

fn lazy_heading_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("h1#firstHeading").unwrap())
}

pub fn is_wikipedia_url(url: &str) -> bool {
    lazy_article_regex().is_match(url)
}

/// Article title from the URL path: percent-decoded, underscores as spaces.
pub fn title_from_url(url: &str) -> Option<String> {
    let raw = lazy_title_regex().captures(url)?.get(1)?.as_str();
    let decoded = urlencoding::decode(raw).ok()?;
    let title = decoded.replace('_', " ").trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Two-letter language subdomain, `en` when absent.
pub fn language_from_url(url: &str) -> String {
    lazy_language_regex()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

pub fn article_url(language: &str, title: &str) -> String {
    format!(
        "https://{}.wikipedia.org/wiki/{}",
        language,
        urlencoding::encode(&title.replace(' ', "_"))
    )
}

fn api_url(language: &str) -> String {
    format!("https://{}.wikipedia.org/w/api.php", language)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedArticle {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone)]
pub struct WikipediaExtractor {
    client: SandboxClient,
    html_fallback: bool,
    /// Replaces `https://{lang}.wikipedia.org` for API and page requests.
    base_url: Option<String>,
}

impl WikipediaExtractor {
    pub fn new(client: SandboxClient) -> Self {
        Self {
            client,
            html_fallback: true,
            base_url: None,
        }
    }

    pub fn with_html_fallback(mut self, enabled: bool) -> Self {
        self.html_fallback = enabled;
        self
    }

    /// Sends every request to a mirror instead of the language edition's host.
    /// Input URLs must still be Wikipedia article URLs.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn api_endpoint(&self, language: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/w/api.php", base),
            None => api_url(language),
        }
    }

    fn page_endpoint(&self, url: &str) -> String {
        let Some(base) = &self.base_url else {
            return url.to_string();
        };
        match reqwest::Url::parse(url) {
            Ok(parsed) => match parsed.query() {
                Some(query) => format!("{}{}?{}", base, parsed.path(), query),
                None => format!("{}{}", base, parsed.path()),
            },
            Err(_) => url.to_string(),
        }
    }

    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        if !is_wikipedia_url(url) {
            return Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: "not a Wikipedia article URL".into(),
            }
            .into());
        }

        let language = language_from_url(url);
        let title = match title_from_url(url) {
            Some(title) => title,
            None => self.fetch_heading(url).await?,
        };

        let (content, method) = match self.fetch_extract(&language, &title).await {
            Ok(Some(text)) => (text, "api"),
            outcome => {
                match outcome {
                    Err(e) => warn!(title = %title, error = %e, "Wikipedia API request failed"),
                    _ => warn!(title = %title, "Wikipedia API returned no extract"),
                }
                if !self.html_fallback {
                    return Err(IngestionError::extraction(
                        SourceKind::Wikipedia,
                        format!("no content returned for '{}'", title),
                    ));
                }
                (self.fetch_rendered_paragraphs(url).await?, "html")
            }
        };

        info!(title = %title, language = %language, method, chars = content.len(), "Extracted Wikipedia article");

        Ok(ExtractionResult::new(content, SourceKind::Wikipedia)
            .with_meta("title", title)
            .with_meta("url", url)
            .with_meta("language", language)
            .with_meta("extraction_method", method))
    }

    async fn fetch_extract(
        &self,
        language: &str,
        title: &str,
    ) -> std::result::Result<Option<String>, scriptorium_common::ScriptoriumError> {
        let body = self
            .client
            .get_json(
                &self.api_endpoint(language),
                &[
                    ("action", "query"),
                    ("format", "json"),
                    ("prop", "extracts"),
                    ("explaintext", "true"),
                    ("titles", title),
                    ("formatversion", "2"),
                ],
            )
            .await?;
        Ok(parse_extract_response(&body))
    }

    async fn fetch_rendered_paragraphs(&self, url: &str) -> Result<String> {
        let html = self.client.get_text(&self.page_endpoint(url)).await.map_err(|e| {
            IngestionError::extraction_with(SourceKind::Wikipedia, "failed to fetch article page", e)
        })?;
        let text = paragraphs_from_html(&html);
        if text.is_empty() {
            return Err(IngestionError::extraction(
                SourceKind::Wikipedia,
                "article page has no paragraph content",
            ));
        }
        debug!(chars = text.len(), "Used rendered page fallback");
        Ok(text)
    }

    async fn fetch_heading(&self, url: &str) -> Result<String> {
        let html = self.client.get_text(&self.page_endpoint(url)).await.map_err(|e| {
            IngestionError::extraction_with(SourceKind::Wikipedia, "failed to fetch article page", e)
        })?;
        heading_from_html(&html).ok_or_else(|| {
            IngestionError::extraction(SourceKind::Wikipedia, "could not determine article title")
        })
    }

    /// Articles found by full-text search for `title`, excluding the article itself.
    #[instrument(skip(self))]
    pub async fn related_articles(
        &self,
        title: &str,
        language: &str,
        limit: usize,
    ) -> Result<Vec<RelatedArticle>> {
        // One extra result since the article usually finds itself.
        let fetch = (limit + 1).to_string();
        let body = self
            .client
            .get_json(
                &self.api_endpoint(language),
                &[
                    ("action", "query"),
                    ("format", "json"),
                    ("list", "search"),
                    ("srsearch", title),
                    ("srlimit", fetch.as_str()),
                    ("formatversion", "2"),
                ],
            )
            .await
            .map_err(|e| {
                IngestionError::extraction_with(SourceKind::Wikipedia, "related article search failed", e)
            })?;
        Ok(parse_search_response(&body, title, language, limit))
    }
}

/// `query.pages[0].extract`, when present and non-blank.
pub fn parse_extract_response(body: &Value) -> Option<String> {
    let extract = body
        .pointer("/query/pages/0/extract")
        .and_then(Value::as_str)?;
    (!extract.trim().is_empty()).then(|| extract.to_string())
}

/// Non-empty paragraph texts of the main content container, blank-line separated.
pub fn paragraphs_from_html(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(lazy_paragraph_selector())
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn heading_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let heading = document.select(lazy_heading_selector()).next()?;
    let text = heading.text().collect::<String>().trim().to_string();
    (!text.is_empty()).then_some(text)
}

pub fn parse_search_response(
    body: &Value,
    own_title: &str,
    language: &str,
    limit: usize,
) -> Vec<RelatedArticle> {
    let Some(results) = body.pointer("/query/search").and_then(Value::as_array) else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(|r| {
            let title = r.get("title")?.as_str()?;
            if title.eq_ignore_ascii_case(own_title) {
                return None;
            }
            let snippet = r.get("snippet").and_then(Value::as_str).unwrap_or_default();
            Some(RelatedArticle {
                title: title.to_string(),
                url: article_url(language, title),
                snippet: strip_markup(snippet),
            })
        })
        .take(limit)
        .collect()
}

/// Search snippets carry `<span class="searchmatch">` highlights and HTML entities.
fn strip_markup(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let text: String = parsed.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
