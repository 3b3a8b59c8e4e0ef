//! GitHub REST payloads for the contents and commits endpoints.

use augments_core::ProviderError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One item of a contents response: a directory listing entry or a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha: String,
    /// Present only when a single file is requested.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    /// Raw file URL; the only way to read files GitHub will not inline.
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ContentItem {
    pub fn is_markdown(&self) -> bool {
        self.kind == EntryType::File && is_markdown_path(&self.name)
    }

    /// Files over 1 MB come back with `encoding: "none"` and no content.
    pub fn is_inline(&self) -> bool {
        self.encoding.as_deref() != Some("none") && self.content.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Decoded text of a file item.
    pub fn decode(&self) -> Result<String, ProviderError> {
        let raw = self
            .content
            .as_deref()
            .ok_or_else(|| ProviderError::UpstreamFormat(format!("{} has no inline content", self.path)))?;

        match self.encoding.as_deref() {
            Some("base64") | None => {
                let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = STANDARD
                    .decode(compact)
                    .map_err(|e| ProviderError::UpstreamFormat(format!("{}: invalid base64 content: {e}", self.path)))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some(other) => Err(ProviderError::UpstreamFormat(format!("{}: unsupported encoding '{other}'", self.path))),
        }
    }
}

/// A contents response is a list for directories and an object for files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Dir(Vec<ContentItem>),
    File(ContentItem),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
}

pub fn is_markdown_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".mdx")
}

/// Markdown files of a listing, `priority` names first in their given
/// order, then the rest by path, at most `limit`.
pub fn select_markdown<'a>(items: &'a [ContentItem], priority: &[String], limit: usize) -> Vec<&'a ContentItem> {
    let mut markdown: Vec<&ContentItem> = items.iter().filter(|i| i.is_markdown()).collect();
    markdown.sort_by(|a, b| a.path.cmp(&b.path));

    let rank = |item: &ContentItem| {
        priority
            .iter()
            .position(|p| p == &item.name || p == &item.path || item.path.ends_with(&format!("/{p}")))
            .unwrap_or(usize::MAX)
    };
    markdown.sort_by_key(|item| rank(*item));
    markdown.truncate(limit);
    markdown
}
