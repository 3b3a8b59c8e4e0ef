//! Upstream documentation provider contract.
//!
//! Concrete providers live in `augments-client`; the orchestrator only sees
//! [`DocProvider`] trait objects grouped in a [`ProviderSet`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::registry::FrameworkDescriptor;

/// Which upstream variant a provider talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    GitHub,
    Website,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::GitHub => "github",
            ProviderKind::Website => "website",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One titled piece of a multi-part provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// Provider output before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawContent {
    pub body: String,
    pub fingerprint: Option<String>,
    pub sections: Vec<RawSection>,
}

impl RawContent {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into(), ..Default::default() }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_section(mut self, id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push(RawSection { id: id.into(), title: title.into(), body: body.into() });
        self
    }
}

/// Result of comparing a known fingerprint against the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreshnessStatus {
    Unchanged,
    Changed(String),
    /// The upstream exposes no comparable signal; callers fall back to TTL.
    Unknown,
}

/// Capability shared by every upstream documentation source.
#[async_trait]
pub trait DocProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Fetch documentation for a framework, optionally narrowed to one section.
    async fn fetch_docs(&self, framework: &FrameworkDescriptor, section: Option<&str>) -> Result<RawContent, ProviderError>;

    /// Fetch code examples, optionally filtered by a pattern.
    async fn fetch_examples(
        &self, framework: &FrameworkDescriptor, pattern: Option<&str>,
    ) -> Result<RawContent, ProviderError>;

    async fn check_freshness(
        &self, framework: &FrameworkDescriptor, known_fingerprint: Option<&str>,
    ) -> Result<FreshnessStatus, ProviderError>;

    /// Release network resources. Safe to call more than once.
    async fn close(&self);
}

/// The providers available to the orchestrator, keyed by variant.
#[derive(Default)]
pub struct ProviderSet {
    providers: HashMap<ProviderKind, Arc<dyn DocProvider>>,
    closed: AtomicBool,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own kind, replacing any previous one.
    pub fn with(mut self, provider: Arc<dyn DocProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn DocProvider>> {
        self.providers.get(&kind).cloned()
    }

    /// Providers for a binding, in binding order, skipping variants not configured.
    pub fn resolve(&self, binding: &[ProviderKind]) -> Vec<Arc<dyn DocProvider>> {
        binding.iter().filter_map(|kind| self.get(*kind)).collect()
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Close every provider exactly once across all callers.
    pub async fn close_all(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for kind in self.kinds() {
            if let Some(provider) = self.providers.get(&kind) {
                provider.close().await;
                tracing::debug!(provider = %kind, "provider closed");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSet")
            .field("kinds", &self.kinds())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    #[test]
    fn test_raw_content_builder() {
        let raw = RawContent::new("body").with_fingerprint("abc").with_section("a", "A", "text");
        assert_eq!(raw.body, "body");
        assert_eq!(raw.fingerprint.as_deref(), Some("abc"));
        assert_eq!(raw.sections.len(), 1);
    }

    #[test]
    fn test_resolve_follows_binding_order() {
        let github = Arc::new(MockProvider::new(ProviderKind::GitHub));
        let website = Arc::new(MockProvider::new(ProviderKind::Website));
        let set = ProviderSet::new().with(website).with(github);

        let resolved = set.resolve(&[ProviderKind::GitHub, ProviderKind::Website]);
        let kinds: Vec<_> = resolved.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![ProviderKind::GitHub, ProviderKind::Website]);

        let only_website = ProviderSet::new().with(Arc::new(MockProvider::new(ProviderKind::Website)));
        assert_eq!(only_website.resolve(&[ProviderKind::GitHub, ProviderKind::Website]).len(), 1);
    }

    #[tokio::test]
    async fn test_close_all_is_idempotent() {
        let provider = Arc::new(MockProvider::new(ProviderKind::Website));
        let set = ProviderSet::new().with(provider.clone());

        set.close_all().await;
        set.close_all().await;

        assert!(set.is_closed());
        assert_eq!(provider.close_calls(), 1);
    }
}
