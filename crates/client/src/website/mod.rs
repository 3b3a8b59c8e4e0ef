//! Website documentation provider.
//!
//! Fetches a documentation page, reduces HTML to Markdown and prefixes the
//! frontmatter header. Markdown and plain-text bodies pass through unchanged
//! apart from the header.
//!
//! Fingerprints are the page's `ETag`, its `Last-Modified`, or a
//! `sha256:` hash of the body, in that order.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use augments_core::{AppConfig, DocProvider, FrameworkDescriptor, FreshnessStatus, ProviderError, ProviderKind, RawContent};
use chrono::Utc;
use reqwest::Url;
use reqwest::header::{ETAG, LAST_MODIFIED};

use crate::extract::{ExtractConfig, ExtractedDoc, extract_readable, fenced_blocks, html_examples, normalize_markdown, render_examples};
use crate::fetch::url::SECTION_PLACEHOLDER;
use crate::fetch::{FetchClient, FetchConfig, FetchResponse, HTML_ACCEPT, content_hash, join_mapped, website_url};

pub const PASSTHROUGH_VERSION: &str = "passthrough";

/// Documentation provider for plain documentation websites.
#[derive(Debug)]
pub struct WebsiteProvider {
    client: FetchClient,
    extract: ExtractConfig,
    closed: AtomicBool,
}

impl WebsiteProvider {
    pub fn new(config: FetchConfig) -> Result<Self, ProviderError> {
        Ok(Self { client: FetchClient::new(config)?, extract: ExtractConfig::default(), closed: AtomicBool::new(false) })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Self::new(FetchConfig::website(config))
    }

    fn ensure_open(&self) -> Result<(), ProviderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::TransientNetwork("website provider is closed".into()));
        }
        Ok(())
    }

    /// Page URL for a section: the descriptor's mapping when it has one,
    /// otherwise the source template.
    fn page_url(descriptor: &FrameworkDescriptor, template: &str, section: Option<&str>) -> Result<Url, ProviderError> {
        let section = section.map(str::trim).filter(|s| !s.is_empty());
        match section.and_then(|s| descriptor.sections.get(s)) {
            Some(mapped) => {
                let base = if template.contains(SECTION_PLACEHOLDER) {
                    website_url(template, None)?
                } else {
                    crate::fetch::parse_source(template)?
                };
                join_mapped(&base, mapped)
            }
            None => website_url(template, section),
        }
    }

    async fn get(&self, url: &Url) -> Result<FetchResponse, ProviderError> {
        self.ensure_open()?;
        self.client.get(url, HTML_ACCEPT).await
    }

    fn readable(&self, response: &FetchResponse) -> Result<ExtractedDoc, ProviderError> {
        let text = response.text();
        if response.is_markdown() {
            let title = text
                .lines()
                .map(str::trim)
                .find_map(|line| line.strip_prefix("# "))
                .map(|t| t.trim().to_string());
            return Ok(ExtractedDoc { title, markdown: text, extractor_version: PASSTHROUGH_VERSION.to_string() });
        }
        extract_readable(&text, &self.extract)
    }
}

#[async_trait]
impl DocProvider for WebsiteProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Website
    }

    async fn fetch_docs(&self, framework: &FrameworkDescriptor, section: Option<&str>) -> Result<RawContent, ProviderError> {
        let template = framework
            .sources
            .documentation
            .website
            .as_deref()
            .ok_or_else(|| ProviderError::NotFound(format!("{} has no website documentation source", framework.name)))?;

        let url = Self::page_url(framework, template, section)?;
        let response = self.get(&url).await?;
        let doc = self.readable(&response)?;

        tracing::debug!(
            framework = %framework.name,
            url = %response.final_url,
            extractor = %doc.extractor_version,
            fetch_ms = response.fetch_ms,
            "website docs fetched"
        );

        let body = normalize_markdown(&doc, &response.final_url, &Utc::now());
        Ok(RawContent::new(body).with_fingerprint(response.fingerprint()))
    }

    async fn fetch_examples(&self, framework: &FrameworkDescriptor, pattern: Option<&str>) -> Result<RawContent, ProviderError> {
        let template = framework
            .examples_source()
            .website
            .as_deref()
            .ok_or_else(|| ProviderError::NotFound(format!("{} has no website examples source", framework.name)))?;

        let url = website_url(template, None)?;
        let response = self.get(&url).await?;
        let text = response.text();

        let examples = if response.is_markdown() {
            fenced_blocks(&text, response.final_url.as_str(), pattern)
        } else {
            html_examples(&text, pattern)
        };

        if examples.is_empty() {
            return Err(ProviderError::NotFound(format!(
                "no examples{} on {}",
                pattern.map(|p| format!(" matching '{p}'")).unwrap_or_default(),
                response.final_url
            )));
        }

        let body = render_examples(&format!("{} examples", framework.display_name), pattern, &examples);
        Ok(RawContent::new(body).with_fingerprint(response.fingerprint()))
    }

    async fn check_freshness(
        &self, framework: &FrameworkDescriptor, known_fingerprint: Option<&str>,
    ) -> Result<FreshnessStatus, ProviderError> {
        let Some(template) = framework.sources.documentation.website.as_deref() else {
            return Ok(FreshnessStatus::Unknown);
        };
        self.ensure_open()?;
        let url = website_url(template, None)?;

        // A rejected HEAD (405) carries no validators.
        let validator = match self.client.head(&url).await {
            Ok(response) => response.header(ETAG).or_else(|| response.header(LAST_MODIFIED)).map(str::to_string),
            Err(ProviderError::UpstreamFormat(_)) => None,
            Err(err) => return Err(err),
        };

        let current = match (validator, known_fingerprint) {
            (Some(validator), _) => validator,
            (None, Some(known)) if known.starts_with("sha256:") => content_hash(&self.get(&url).await?.bytes),
            (None, _) => return Ok(FreshnessStatus::Unknown),
        };

        Ok(if known_fingerprint == Some(current.as_str()) {
            FreshnessStatus::Unchanged
        } else {
            FreshnessStatus::Changed(current)
        })
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("website provider closed");
        }
    }
}
