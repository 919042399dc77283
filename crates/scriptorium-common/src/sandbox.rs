use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::error::ScriptoriumError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; Scriptorium/0.1; +content-ingestion)";

/// An HTTP client that only talks to approved content sources.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist, timeout and user agent.
    pub fn new() -> Result<Self, ScriptoriumError> {
        Self::with_settings(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self, ScriptoriumError> {
        let mut allowlist = HashSet::new();
        let domains = [
            "wikipedia.org",           // every language edition, matched as subdomain
            "pubmed.ncbi.nlm.nih.gov", // PubMed article pages
        ];
        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ScriptoriumError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_ascii_lowercase());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.allowlist
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
    }

    fn check(&self, url: &str) -> Result<(), ScriptoriumError> {
        if self.is_allowed(url) {
            return Ok(());
        }
        warn!(url, "Blocked request to host outside allowlist");
        Err(ScriptoriumError::SecurityError(format!(
            "Network capabilities capped: domain not in allowlist for URL {}",
            url
        )))
    }

    /// GET request builder, refused for hosts outside the allowlist.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, ScriptoriumError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    /// Fetches a URL and returns the body as text, treating non-2xx statuses as errors.
    pub async fn get_text(&self, url: &str) -> Result<String, ScriptoriumError> {
        let resp = self.get(url)?.send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }

    /// Fetches a URL with query parameters and decodes the JSON body.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, ScriptoriumError> {
        let resp = self.get(url)?.query(query).send().await?.error_for_status()?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
