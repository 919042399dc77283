//! PubMed article page scraping.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use scriptorium_common::SandboxClient;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{info, instrument};

use crate::error::{IngestionError, Result, ValidationError};
use crate::models::{ExtractionResult, SourceKind};

pub const ABSTRACT_NOT_AVAILABLE: &str = "Abstract not available.";

fn lazy_article_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://(www\.)?pubmed\.ncbi\.nlm\.nih\.gov/(\d+)").unwrap())
}

fn selector(slot: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    slot.get_or_init(|| Selector::parse(css).unwrap())
}

fn title_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "h1.heading-title")
}

fn abstract_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "div#abstract")
}

fn author_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "div.authors-list span.authors-list-item")
}

fn author_name_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "a.full-name")
}

fn citation_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "span.cit")
}

fn doi_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "span.identifier.doi")
}

pub fn is_pubmed_url(url: &str) -> bool {
    lazy_article_regex().is_match(url)
}

pub fn pmid_from_url(url: &str) -> Option<String> {
    lazy_article_regex()
        .captures(url)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone)]
pub struct PubMedExtractor {
    client: SandboxClient,
    /// Replaces `https://pubmed.ncbi.nlm.nih.gov` when fetching article pages.
    base_url: Option<String>,
}

impl PubMedExtractor {
    pub fn new(client: SandboxClient) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn page_endpoint(&self, url: &str, pmid: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{}/", base, pmid),
            None => url.to_string(),
        }
    }

    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        let Some(pmid) = pmid_from_url(url) else {
            return Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: "not a PubMed article URL".into(),
            }
            .into());
        };

        let html = self.client.get_text(&self.page_endpoint(url, &pmid)).await.map_err(|e| {
            IngestionError::extraction_with(SourceKind::PubMed, "failed to fetch article page", e)
        })?;
        let record = parse_article_html(&html, url, &pmid)?;

        info!(pmid = %pmid, chars = record.content.len(), "Extracted PubMed abstract");
        Ok(record)
    }
}

/// Parses a rendered article page. The title element is the only required part.
pub fn parse_article_html(html: &str, url: &str, pmid: &str) -> Result<ExtractionResult> {
    let document = Html::parse_document(html);

    let title = document
        .select(title_selector())
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| IngestionError::extraction(SourceKind::PubMed, "title element not found"))?;

    let abstract_text = document
        .select(abstract_selector())
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| ABSTRACT_NOT_AVAILABLE.to_string());

    let authors: Vec<Value> = document
        .select(author_selector())
        .map(|item| {
            let name = item
                .select(author_name_selector())
                .next()
                .map(element_text)
                .unwrap_or_else(|| element_text(item));
            name.trim_end_matches(',').trim().to_string()
        })
        .filter(|name| !name.is_empty())
        .map(Value::String)
        .collect();

    let publication_date = document
        .select(citation_selector())
        .next()
        .map(element_text)
        .unwrap_or_default();

    let doi = document
        .select(doi_selector())
        .next()
        .map(element_text)
        .map(|t| t.replace("doi: ", "").replace("DOI: ", "").trim().to_string())
        .unwrap_or_default();

    Ok(ExtractionResult::new(abstract_text, SourceKind::PubMed)
        .with_meta("title", title)
        .with_meta("url", url)
        .with_meta("pmid", pmid)
        .with_meta("doi", doi)
        .with_meta("authors", Value::Array(authors))
        .with_meta("publication_date", publication_date))
}

/// Element text with whitespace runs collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const ARTICLE: &str = r#"<html><body>
      <h1 class="heading-title">
        Aspirin and   colorectal cancer
      </h1>
      <div class="authors-list">
        <span class="authors-list-item"><a class="full-name">Ada Lovelace</a><sup>1</sup>,</span>
        <span class="authors-list-item"><a class="full-name">Alan Turing</a></span>
      </div>
      <span class="cit">2021 Mar;12(3):45-67.</span>
      <span class="identifier doi">doi: 10.1000/xyz123</span>
      <div id="abstract"><h2>Abstract</h2><p>BACKGROUND: An RCT was run. RESULTS: It helped.</p></div>
    </body></html>"#;

    #[test]
    fn test_pmid_and_pattern() {
        assert_eq!(pmid_from_url("https://pubmed.ncbi.nlm.nih.gov/33445566/").as_deref(), Some("33445566"));
        assert!(is_pubmed_url("http://www.pubmed.ncbi.nlm.nih.gov/1"));
        assert!(!is_pubmed_url("https://pubmed.ncbi.nlm.nih.gov/?term=cancer"));
        assert!(!is_pubmed_url("https://example.org/pubmed.ncbi.nlm.nih.gov/123"));
    }

    #[test]
    fn test_parse_full_article() {
        let url = "https://pubmed.ncbi.nlm.nih.gov/33445566/";
        let rec = parse_article_html(ARTICLE, url, "33445566").unwrap();
        assert_eq!(rec.content, "Abstract BACKGROUND: An RCT was run. RESULTS: It helped.");
        let m = &rec.metadata;
        assert_eq!(m["source"], "pubmed");
        assert_eq!(m["title"], "Aspirin and colorectal cancer");
        assert_eq!(m["pmid"], "33445566");
        assert_eq!(m["doi"], "10.1000/xyz123");
        assert_eq!(m["publication_date"], "2021 Mar;12(3):45-67.");
        assert_eq!(m["authors"], serde_json::json!(["Ada Lovelace", "Alan Turing"]));
        let keys: Vec<_> = m.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["source", "title", "url", "pmid", "doi", "authors", "publication_date"]
        );
    }

    #[test]
    fn test_missing_abstract_uses_sentinel() {
        let html = r#"<h1 class="heading-title">Short note</h1>"#;
        let rec = parse_article_html(html, "https://pubmed.ncbi.nlm.nih.gov/1/", "1").unwrap();
        assert_eq!(rec.content, ABSTRACT_NOT_AVAILABLE);
        assert_eq!(rec.metadata["doi"], "");
        assert_eq!(rec.metadata["authors"], serde_json::json!([]));
    }

    #[test]
    fn test_missing_title_is_extraction_error() {
        let err = parse_article_html("<div id=\"abstract\">x</div>", "u", "1").unwrap_err();
        assert!(matches!(err, IngestionError::Extraction { source_kind: SourceKind::PubMed, .. }));
    }

    fn mirrored(server: &Server) -> PubMedExtractor {
        let mut client = SandboxClient::new().unwrap();
        client.allow_domain("127.0.0.1");
        PubMedExtractor::new(client).with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_extract_fetches_and_parses_article_page() {
        let mut server = Server::new_async().await;
        let page = server
            .mock("GET", "/33445566/")
            .match_query(Matcher::Any)
            .with_header("content-type", "text/html")
            .with_body(ARTICLE)
            .create_async()
            .await;

        let url = "https://pubmed.ncbi.nlm.nih.gov/33445566/";
        let rec = mirrored(&server).extract(url).await.unwrap();

        assert_eq!(rec.metadata["title"], "Aspirin and colorectal cancer");
        assert_eq!(rec.metadata["pmid"], "33445566");
        assert_eq!(rec.metadata["url"], url);
        assert!(rec.content.contains("RESULTS: It helped."));
        page.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_article_page_is_extraction_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/404404/")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = mirrored(&server)
            .extract("https://pubmed.ncbi.nlm.nih.gov/404404")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Extraction { source_kind: SourceKind::PubMed, .. }));
    }
}
