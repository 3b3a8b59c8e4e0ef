//! Markdown normalization with YAML frontmatter.
//!
//! Every website document is cached with the same header so its origin and
//! extraction path stay visible to readers of the cache.

use chrono::{DateTime, Utc};
use url::Url;

/// Extracted document with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDoc {
    /// Page title
    pub title: Option<String>,
    /// Markdown content
    pub markdown: String,
    /// Which extraction path produced the content
    pub extractor_version: String,
}

/// Prefix `doc` with a frontmatter header.
///
/// ```yaml
/// ---
/// title: <page title>
/// source: <final_url>
/// fetched_at: <ISO8601 timestamp>
/// extractor: <extractor>
/// ---
/// <markdown body>
/// ```
pub fn normalize_markdown(doc: &ExtractedDoc, source_url: &Url, fetched_at: &DateTime<Utc>) -> String {
    let title = doc.title.as_deref().map(str::trim).filter(|t| !t.is_empty()).unwrap_or("Untitled");

    format!(
        "---\ntitle: {title}\nsource: {source}\nfetched_at: {timestamp}\nextractor: {extractor}\n---\n\n{markdown}",
        title = escape_yaml(title),
        source = source_url.as_str(),
        timestamp = fetched_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        extractor = doc.extractor_version,
        markdown = doc.markdown.trim()
    )
}

fn escape_yaml(s: &str) -> String {
    if s.contains('\n') || s.contains(": ") || s.starts_with(['"', '\'', '#', '-', '[', '{']) {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " "))
    } else {
        s.to_string()
    }
}
