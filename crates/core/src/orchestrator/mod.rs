//! Documentation service: registry + cache + providers behind one API.
//!
//! Every retrieval follows the same path: resolve the framework, serve a
//! fresh cache entry if allowed, otherwise fetch through the cache from the
//! framework's providers in binding order, and fall back to a stale copy
//! when the upstream failure allows it.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheEntry, CacheKey, ContentKind, DocumentationCache};
use crate::error::{Error, ProviderError};
use crate::provider::{DocProvider, ProviderKind, ProviderSet, RawContent};
use crate::registry::{FrameworkDescriptor, Registry};

mod compat;
mod context;
mod refresh;
mod search;

pub use compat::{CompatibilityIssue, CompatibilityReport, FrameworkCompatibility};
pub use refresh::{FrameworkRefresh, RefreshOutcome, RefreshReport, UpdateReport, UpdateStatus};
pub use search::{MAX_SEARCH_RESULTS, SearchHit};

/// Where a retrieved document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Cache,
    Upstream,
    /// An expired cached copy served because the upstream failed.
    Stale,
}

/// A resolved document plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retrieved {
    pub framework: String,
    pub section: Option<String>,
    pub kind: ContentKind,
    pub content: String,
    pub origin: Origin,
    pub fetched_at: DateTime<Utc>,
    pub fingerprint: Option<String>,
}

impl Retrieved {
    fn new(key: &CacheKey, entry: CacheEntry, origin: Origin) -> Self {
        Self {
            framework: key.framework.clone(),
            section: key.section().map(str::to_string),
            kind: key.kind,
            content: entry.content,
            origin,
            fetched_at: entry.fetched_at,
            fingerprint: entry.fingerprint,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.origin == Origin::Stale
    }

    /// Content as returned to callers; stale copies carry a leading notice.
    pub fn into_text(self) -> String {
        if self.is_stale() {
            format!(
                "> Note: the upstream source is unavailable. Showing a cached copy from {} that may be outdated.\n\n{}",
                self.fetched_at.to_rfc3339(),
                self.content
            )
        } else {
            self.content
        }
    }
}

pub struct DocsService {
    registry: Arc<Registry>,
    cache: DocumentationCache,
    providers: Arc<ProviderSet>,
    context_excerpt_chars: usize,
}

impl fmt::Debug for DocsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocsService")
            .field("frameworks", &self.registry.count())
            .field("cache", &self.cache)
            .field("providers", &self.providers)
            .finish()
    }
}

impl DocsService {
    pub fn new(registry: Arc<Registry>, cache: DocumentationCache, providers: Arc<ProviderSet>) -> Self {
        Self { registry, cache, providers, context_excerpt_chars: 4_000 }
    }

    /// Per-framework character budget used by [`DocsService::get_framework_context`].
    pub fn with_context_excerpt_chars(mut self, chars: usize) -> Self {
        self.context_excerpt_chars = chars.max(1);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &DocumentationCache {
        &self.cache
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    fn resolve(&self, framework: &str) -> Result<Arc<FrameworkDescriptor>, Error> {
        self.registry.get(framework).ok_or_else(|| Error::FrameworkNotFound(framework.trim().to_string()))
    }

    fn binding_for(descriptor: &FrameworkDescriptor, kind: ContentKind) -> Vec<ProviderKind> {
        match kind {
            ContentKind::Examples => descriptor.examples_binding(),
            _ => descriptor.provider_binding(),
        }
    }

    fn providers_for(&self, descriptor: &FrameworkDescriptor, kind: ContentKind) -> Vec<Arc<dyn DocProvider>> {
        self.providers.resolve(&Self::binding_for(descriptor, kind))
    }

    /// Documentation for a framework, optionally one section of it.
    ///
    /// # Errors
    ///
    /// - `FrameworkNotFound` if the registry does not know the framework
    /// - `Provider(NotFound)` if every provider reports the docs missing
    /// - `AllSourcesFailed` if the upstream failed and nothing is cached
    pub async fn get_framework_docs(&self, framework: &str, section: Option<&str>, use_cache: bool) -> Result<Retrieved, Error> {
        self.retrieve(ContentKind::Docs, framework, section, use_cache).await
    }

    /// Code examples for a framework, optionally filtered by a pattern.
    pub async fn get_framework_examples(&self, framework: &str, pattern: Option<&str>) -> Result<Retrieved, Error> {
        self.retrieve(ContentKind::Examples, framework, pattern, true).await
    }

    async fn retrieve(&self, kind: ContentKind, framework: &str, section: Option<&str>, use_cache: bool) -> Result<Retrieved, Error> {
        let descriptor = self.resolve(framework)?;
        let section = section.map(str::trim).filter(|s| !s.is_empty());
        let key = CacheKey::new(&descriptor.name, section, kind);

        if use_cache && let Some(entry) = self.cache.get(&key).await {
            return Ok(Retrieved::new(&key, entry, Origin::Cache));
        }

        let binding = Self::binding_for(&descriptor, kind);
        let providers = self.providers.resolve(&binding);
        if providers.is_empty() {
            let reason = format!("no configured provider for bindings {binding:?}");
            return self.serve_stale(&key, reason).await;
        }

        let result = self.fetch_through(&key, descriptor, providers, use_cache).await;
        match result {
            Ok(retrieved) => Ok(retrieved),
            Err(err) if err.allows_stale_fallback() => self.serve_stale(&key, err.to_string()).await,
            Err(err) => Err(Error::Provider(err)),
        }
    }

    /// Fetch `key` from `providers` through the cache.
    async fn fetch_through(
        &self, key: &CacheKey, descriptor: Arc<FrameworkDescriptor>, providers: Vec<Arc<dyn DocProvider>>, use_cache: bool,
    ) -> Result<Retrieved, ProviderError> {
        let kind = key.kind;
        let section = key.section().map(str::to_string);
        let outcome = self
            .cache
            .fetch_through(key, use_cache, move || fetch_from_providers(providers, descriptor, kind, section))
            .await?;
        let origin = if outcome.from_upstream { Origin::Upstream } else { Origin::Cache };
        Ok(Retrieved::new(key, outcome.entry, origin))
    }

    async fn serve_stale(&self, key: &CacheKey, reason: String) -> Result<Retrieved, Error> {
        match self.cache.get_stale_allowed(key).await {
            Some(entry) => {
                tracing::warn!(key = %key, fetched_at = %entry.fetched_at, reason = %reason, "upstream failed, serving stale cache entry");
                Ok(Retrieved::new(key, entry, Origin::Stale))
            }
            None => Err(Error::AllSourcesFailed { framework: key.framework.clone(), reason }),
        }
    }
}

/// Try each provider in order until one yields usable content.
///
/// When all fail the error is `NotFound` only if every provider said so;
/// otherwise it is the first failure of any other kind.
async fn fetch_from_providers(
    providers: Vec<Arc<dyn DocProvider>>, descriptor: Arc<FrameworkDescriptor>, kind: ContentKind, section: Option<String>,
) -> Result<CacheEntry, ProviderError> {
    let mut first_not_found = None;
    let mut first_other = None;

    for provider in &providers {
        let result = match kind {
            ContentKind::Examples => provider.fetch_examples(&descriptor, section.as_deref()).await,
            _ => provider.fetch_docs(&descriptor, section.as_deref()).await,
        };

        match result.and_then(normalize) {
            Ok(entry) => {
                let entry = entry.with_provider(provider.kind());
                tracing::debug!(framework = %descriptor.name, provider = %provider.kind(), kind = %kind, size = entry.size, "upstream fetch succeeded");
                return Ok(entry);
            }
            Err(err) => {
                tracing::debug!(framework = %descriptor.name, provider = %provider.kind(), error = %err, "provider failed");
                match err {
                    ProviderError::NotFound(_) => {
                        first_not_found.get_or_insert(err);
                    }
                    _ => {
                        first_other.get_or_insert(err);
                    }
                }
            }
        }
    }

    Err(first_other
        .or(first_not_found)
        .unwrap_or_else(|| ProviderError::NotFound(format!("no provider for {}", descriptor.name))))
}

/// Merge sub-sections into the body under `## <title>` headings.
fn normalize(raw: RawContent) -> Result<CacheEntry, ProviderError> {
    let mut content = raw.body.trim().to_string();
    for section in raw.sections {
        let body = section.body.trim();
        if body.is_empty() {
            continue;
        }
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        let title = if section.title.trim().is_empty() { section.id.as_str() } else { section.title.trim() };
        content.push_str(&format!("## {title}\n\n{body}"));
    }

    if content.is_empty() {
        return Err(ProviderError::UpstreamFormat("provider returned empty content".into()));
    }
    Ok(CacheEntry::new(content, raw.fingerprint))
}
