//! Framework descriptor files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::provider::ProviderKind;

/// Framework category.
///
/// Unknown category strings in descriptor files deserialize as [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum Category {
    Web,
    Backend,
    Mobile,
    AiMl,
    Design,
    Tools,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Web,
        Category::Backend,
        Category::Mobile,
        Category::AiMl,
        Category::Design,
        Category::Tools,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Web => "web",
            Category::Backend => "backend",
            Category::Mobile => "mobile",
            Category::AiMl => "ai-ml",
            Category::Design => "design",
            Category::Tools => "tools",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse used for caller-supplied filters.
impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| {
                let valid: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
                format!("unknown category '{}', expected one of: {}", s.trim(), valid.join(", "))
            })
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Category::Other)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Info,
}

/// A known code pattern that clashes with a framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompatiblePattern {
    pub pattern: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    /// Treat `pattern` as a regular expression instead of a literal.
    #[serde(default)]
    pub regex: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubSource {
    /// `owner/repo`.
    pub repo: String,
    #[serde(default = "default_docs_path")]
    pub docs_path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl GithubSource {
    pub fn owner_repo(&self) -> Option<(&str, &str)> {
        let (owner, repo) = self.repo.split_once('/')?;
        let valid = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        (valid(owner) && valid(repo)).then_some((owner, repo))
    }
}

fn default_docs_path() -> String {
    "docs".into()
}

fn default_branch() -> String {
    "main".into()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl SourceSpec {
    pub fn is_empty(&self) -> bool {
        self.github.is_none() && self.website.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sources {
    #[serde(default)]
    pub documentation: SourceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<SourceSpec>,
}

/// A documentable framework and where its docs live.
///
/// Immutable once the registry has loaded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkDescriptor {
    /// Unique identifier, trimmed and lowercased on load.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub category: Category,
    #[serde(rename = "type", default)]
    pub framework_type: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub sources: Sources,
    /// Section id to repository path or URL fragment.
    #[serde(default)]
    pub sections: BTreeMap<String, String>,
    #[serde(default)]
    pub context_files: Vec<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub common_patterns: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default)]
    pub incompatible_patterns: Vec<IncompatiblePattern>,
}

fn default_version() -> String {
    "latest".into()
}

fn default_priority() -> u32 {
    50
}

impl FrameworkDescriptor {
    /// Parse and validate one descriptor file's contents.
    pub fn from_json(path: &Path, json: &str) -> Result<Self, RegistryError> {
        let malformed = |reason: String| RegistryError::MalformedDescriptor { path: path.to_path_buf(), reason };

        let mut descriptor: Self = serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
        descriptor.normalize();
        descriptor.validate().map_err(malformed)?;
        Ok(descriptor)
    }

    fn normalize(&mut self) {
        self.name = normalize_identifier(&self.name);
        if self.display_name.trim().is_empty() {
            self.display_name = self.name.clone();
        }
        for tag in &mut self.tags {
            *tag = tag.trim().to_lowercase();
        }
        self.tags.retain(|t| !t.is_empty());
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("name must not be empty".into());
        }
        if self.sources.documentation.is_empty() {
            return Err("sources.documentation needs a github or website source".into());
        }

        let specs = std::iter::once(&self.sources.documentation).chain(self.sources.examples.as_ref());
        for spec in specs {
            if let Some(github) = &spec.github
                && github.owner_repo().is_none()
            {
                return Err(format!("github repo '{}' is not in owner/repo form", github.repo));
            }
            if let Some(website) = &spec.website
                && !(website.starts_with("https://") || website.starts_with("http://"))
            {
                return Err(format!("website '{website}' is not an http(s) URL"));
            }
        }

        for pattern in self.incompatible_patterns.iter().filter(|p| p.regex) {
            regex::Regex::new(&pattern.pattern)
                .map_err(|e| format!("incompatible pattern '{}' is not a valid regex: {e}", pattern.pattern))?;
        }

        Ok(())
    }

    /// Provider variants able to serve this framework's docs, in preference order.
    pub fn provider_binding(&self) -> Vec<ProviderKind> {
        let mut binding = Vec::with_capacity(2);
        if self.sources.documentation.github.is_some() {
            binding.push(ProviderKind::GitHub);
        }
        if self.sources.documentation.website.is_some() {
            binding.push(ProviderKind::Website);
        }
        binding
    }

    /// Source used for examples; falls back to the documentation source.
    pub fn examples_source(&self) -> &SourceSpec {
        match &self.sources.examples {
            Some(spec) if !spec.is_empty() => spec,
            _ => &self.sources.documentation,
        }
    }

    /// Provider variants able to serve examples, in preference order.
    pub fn examples_binding(&self) -> Vec<ProviderKind> {
        let source = self.examples_source();
        let mut binding = Vec::with_capacity(2);
        if source.github.is_some() {
            binding.push(ProviderKind::GitHub);
        }
        if source.website.is_some() {
            binding.push(ProviderKind::Website);
        }
        binding
    }

    /// Tags, key features and common patterns, lowercased.
    pub fn search_tags(&self) -> impl Iterator<Item = String> + '_ {
        self.tags
            .iter()
            .chain(&self.key_features)
            .chain(&self.common_patterns)
            .map(|t| t.to_lowercase())
    }
}

pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Listing shape returned by framework listing and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkSummary {
    pub name: String,
    pub display_name: String,
    pub category: Category,
    pub description: String,
    pub tags: Vec<String>,
    pub version: String,
    pub priority: u32,
}

impl From<&FrameworkDescriptor> for FrameworkSummary {
    fn from(d: &FrameworkDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            display_name: d.display_name.clone(),
            category: d.category,
            description: d.description.clone(),
            tags: d.tags.clone(),
            version: d.version.clone(),
            priority: d.priority,
        }
    }
}

/// Full descriptor plus the resolved provider binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkDetail {
    #[serde(flatten)]
    pub descriptor: FrameworkDescriptor,
    pub providers: Vec<ProviderKind>,
}

impl From<&FrameworkDescriptor> for FrameworkDetail {
    fn from(d: &FrameworkDescriptor) -> Self {
        Self { providers: d.provider_binding(), descriptor: d.clone() }
    }
}
