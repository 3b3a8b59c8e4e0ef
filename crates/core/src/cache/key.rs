//! Cache keys and their on-disk paths.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::registry::normalize_identifier;

const DEFAULT_SECTION: &str = "default";
const MAX_COMPONENT_CHARS: usize = 96;

/// Category of cached content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Docs,
    Examples,
    SearchIndex,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Docs, ContentKind::Examples, ContentKind::SearchIndex];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Docs => "docs",
            ContentKind::Examples => "examples",
            ContentKind::SearchIndex => "search-index",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (framework, section, kind). An empty section means the whole/default document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub framework: String,
    pub section: String,
    pub kind: ContentKind,
}

impl CacheKey {
    pub fn new(framework: &str, section: Option<&str>, kind: ContentKind) -> Self {
        Self {
            framework: normalize_identifier(framework),
            section: section.map(str::trim).unwrap_or_default().to_string(),
            kind,
        }
    }

    pub fn docs(framework: &str, section: Option<&str>) -> Self {
        Self::new(framework, section, ContentKind::Docs)
    }

    pub fn examples(framework: &str, pattern: Option<&str>) -> Self {
        Self::new(framework, pattern, ContentKind::Examples)
    }

    /// Memoized search results for a normalized query.
    pub fn search_index(framework: &str, query: &str) -> Self {
        Self::new(framework, Some(query), ContentKind::SearchIndex)
    }

    pub fn is_default_section(&self) -> bool {
        self.section.is_empty()
    }

    pub fn section(&self) -> Option<&str> {
        (!self.section.is_empty()).then_some(self.section.as_str())
    }

    /// `<framework>/<kind>/<section|default>.json`, relative to the cache root.
    pub fn relative_path(&self) -> PathBuf {
        let section = if self.section.is_empty() { DEFAULT_SECTION.to_string() } else { path_component(&self.section) };
        let mut path = PathBuf::from(path_component(&self.framework));
        path.push(self.kind.as_str());
        path.push(format!("{section}.json"));
        path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let section = if self.section.is_empty() { DEFAULT_SECTION } else { &self.section };
        write!(f, "{}/{}/{}", self.framework, self.kind, section)
    }
}

/// Make one user-supplied string safe as a single path component.
///
/// Any component that had to change (or that would shadow the default
/// section) gets an 8-hex-digit SHA-256 suffix of the original so two
/// different inputs never map to the same file.
fn path_component(raw: &str) -> String {
    let mut cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .take(MAX_COMPONENT_CHARS)
        .collect();
    if cleaned.starts_with('.') {
        cleaned.replace_range(..1, "_");
    }

    let altered = cleaned != raw || raw == DEFAULT_SECTION || raw.ends_with(".tmp");
    if !altered {
        return cleaned;
    }

    let digest = hex::encode(Sha256::digest(raw.as_bytes()));
    format!("{cleaned}-{}", &digest[..8])
}
