//! Scripted provider and fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::DocumentationCache;
use crate::config::TtlConfig;
use crate::error::ProviderError;
use crate::orchestrator::DocsService;
use crate::provider::{DocProvider, FreshnessStatus, ProviderKind, ProviderSet, RawContent};
use crate::registry::{Category, FrameworkDescriptor, IncompatiblePattern, Registry, Severity, SourceSpec, Sources};

/// Provider whose answers are scripted and whose calls are counted.
pub struct MockProvider {
    kind: ProviderKind,
    failure: Mutex<Option<ProviderError>>,
    body: Mutex<Option<String>>,
    freshness: Mutex<FreshnessStatus>,
    delay: Mutex<Duration>,
    docs_calls: AtomicUsize,
    examples_calls: AtomicUsize,
    freshness_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            failure: Mutex::new(None),
            body: Mutex::new(None),
            freshness: Mutex::new(FreshnessStatus::Unknown),
            delay: Mutex::new(Duration::ZERO),
            docs_calls: AtomicUsize::new(0),
            examples_calls: AtomicUsize::new(0),
            freshness_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(self, err: ProviderError) -> Self {
        self.fail_with(err);
        self
    }

    pub fn with_body(self, body: &str) -> Self {
        self.set_body(body);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn with_freshness(self, status: FreshnessStatus) -> Self {
        *self.freshness.lock().unwrap() = status;
        self
    }

    pub fn fail_with(&self, err: ProviderError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn set_body(&self, body: &str) {
        *self.body.lock().unwrap() = Some(body.to_string());
    }

    pub fn docs_calls(&self) -> usize {
        self.docs_calls.load(Ordering::SeqCst)
    }

    pub fn examples_calls(&self) -> usize {
        self.examples_calls.load(Ordering::SeqCst)
    }

    pub fn freshness_calls(&self) -> usize {
        self.freshness_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, framework: &FrameworkDescriptor, what: &str, detail: Option<&str>) -> Result<RawContent, ProviderError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        let body = self.body.lock().unwrap().clone().unwrap_or_else(|| {
            format!(
                "# {} {what}\n\n{} {what} from {}.\n\n## Details\n\n{}",
                framework.display_name,
                framework.name,
                self.kind,
                detail.unwrap_or("overview")
            )
        });
        Ok(RawContent::new(body).with_fingerprint(format!("{}-v1", self.kind)))
    }
}

#[async_trait]
impl DocProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch_docs(&self, framework: &FrameworkDescriptor, section: Option<&str>) -> Result<RawContent, ProviderError> {
        self.docs_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(framework, "docs", section).await
    }

    async fn fetch_examples(
        &self, framework: &FrameworkDescriptor, pattern: Option<&str>,
    ) -> Result<RawContent, ProviderError> {
        self.examples_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(framework, "examples", pattern).await
    }

    async fn check_freshness(
        &self, _framework: &FrameworkDescriptor, _known_fingerprint: Option<&str>,
    ) -> Result<FreshnessStatus, ProviderError> {
        self.freshness_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.freshness.lock().unwrap().clone())
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn descriptor(name: &str, category: Category, tags: &[&str]) -> FrameworkDescriptor {
    FrameworkDescriptor {
        name: name.into(),
        display_name: name.into(),
        category,
        framework_type: "library".into(),
        version: "latest".into(),
        description: format!("{name} framework"),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        sources: Sources {
            documentation: SourceSpec { github: None, website: Some(format!("https://{name}.dev/docs")) },
            examples: None,
        },
        sections: Default::default(),
        context_files: vec![],
        key_features: vec![],
        common_patterns: vec![],
        priority: 50,
        incompatible_patterns: vec![],
    }
}

pub fn pattern(pattern: &str, severity: Severity, regex: bool) -> IncompatiblePattern {
    IncompatiblePattern {
        pattern: pattern.into(),
        message: format!("avoid {pattern}"),
        suggestion: None,
        severity,
        regex,
    }
}

/// `{react: web, laravel: backend, tailwindcss: web}`.
pub fn seeded_registry() -> Arc<Registry> {
    Arc::new(Registry::from_descriptors([
        descriptor("react", Category::Web, &["ui", "components", "hooks"]),
        descriptor("laravel", Category::Backend, &["php", "mvc"]),
        descriptor("tailwindcss", Category::Web, &["css", "utility"]),
    ]))
}

/// Service over [`seeded_registry`] with a fresh cache in `dir`.
pub fn service(dir: &tempfile::TempDir, provider: Arc<MockProvider>) -> DocsService {
    let cache = DocumentationCache::open(dir.path(), TtlConfig::default()).unwrap();
    let providers = Arc::new(ProviderSet::new().with(provider));
    DocsService::new(seeded_registry(), cache, providers)
}
