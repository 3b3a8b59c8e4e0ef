//! Application context: the live service bundle and its lifecycle.
//!
//! All boundary calls go through [`AppContext`]. Until [`AppContext::initialize`]
//! succeeds, and again after [`AppContext::shutdown`], the context holds no
//! services and every call fails with `UNINITIALIZED`.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::cache::{CacheStatistics, DocumentationCache};
use crate::config::AppConfig;
use crate::error::Error;
use crate::orchestrator::{
    CompatibilityReport, DocsService, MAX_SEARCH_RESULTS, RefreshReport, SearchHit, UpdateReport,
};
use crate::provider::ProviderSet;
use crate::registry::{Category, FrameworkDetail, FrameworkSummary, RankedFramework, Registry, RegistryStatistics};
use crate::warmer::Warmer;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

struct Services {
    docs: Arc<DocsService>,
    providers: Arc<ProviderSet>,
    config: AppConfig,
    warmer: Mutex<Option<Warmer>>,
}

#[derive(Default)]
pub struct AppContext {
    state: RwLock<Option<Arc<Services>>>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext").field("initialized", &self.is_initialized()).finish()
    }
}

fn require<'a>(value: &'a str, what: &str) -> Result<&'a str, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}

fn require_list(values: &[String], what: &str) -> Result<(), Error> {
    if values.iter().all(|v| v.trim().is_empty()) {
        return Err(Error::InvalidArgument(format!("{what} must name at least one framework")));
    }
    Ok(())
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Build the registry, cache and service from `config`, taking ownership
    /// of `providers`.
    ///
    /// On failure the context stays uninitialized and `providers` are closed.
    /// A context that is already initialized is shut down first.
    ///
    /// # Errors
    ///
    /// `Config` for invalid settings, `Registry` when the descriptor directory
    /// cannot be read, `Cache` when the cache root is unusable.
    pub async fn initialize(&self, config: AppConfig, providers: ProviderSet) -> Result<(), Error> {
        if self.is_initialized() {
            tracing::warn!("re-initializing application context");
            self.shutdown().await;
        }

        let providers = Arc::new(providers);
        match Self::build(config, providers.clone()) {
            Ok(services) => {
                let services = Arc::new(services);
                *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(services.clone());
                tracing::info!(
                    frameworks = services.docs.registry().count(),
                    providers = ?providers.kinds(),
                    cache_dir = %services.docs.cache().root().display(),
                    "application context initialized"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "initialization failed");
                *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
                providers.close_all().await;
                Err(err)
            }
        }
    }

    fn build(config: AppConfig, providers: Arc<ProviderSet>) -> Result<Services, Error> {
        config.validate()?;

        let mut registry = Registry::new(&config.frameworks_dir);
        registry.load()?;

        let cache = DocumentationCache::open(&config.cache_dir, config.ttl)?;
        let docs = DocsService::new(Arc::new(registry), cache, providers.clone())
            .with_context_excerpt_chars(config.context_excerpt_chars);

        Ok(Services { docs: Arc::new(docs), providers, config, warmer: Mutex::new(None) })
    }

    /// Start the background warmer over the configured seed list.
    ///
    /// Returns `false` when warming is disabled or already running.
    ///
    /// # Errors
    ///
    /// `UNINITIALIZED` before [`AppContext::initialize`].
    pub fn start_warmer(&self) -> Result<bool, Error> {
        let services = self.services()?;
        if !services.config.warm_on_start || services.config.warm_frameworks.is_empty() {
            return Ok(false);
        }

        let mut slot = services.warmer.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|w| !w.is_finished()) {
            return Ok(false);
        }
        *slot = Some(Warmer::spawn(services.docs.clone(), services.config.warm_frameworks.clone()));
        Ok(true)
    }

    /// Tear down: stop the warmer and close providers. Idempotent.
    pub async fn shutdown(&self) {
        let Some(services) = self.state.write().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };

        if let Some(warmer) = services.warmer.lock().unwrap_or_else(PoisonError::into_inner).take() {
            warmer.abort();
        }
        services.providers.close_all().await;
        tracing::info!("application context shut down");
    }

    fn services(&self) -> Result<Arc<Services>, Error> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::Uninitialized("the documentation service is not initialized".into()))
    }

    /// The running service, for callers that need more than the boundary calls.
    pub fn docs(&self) -> Result<Arc<DocsService>, Error> {
        Ok(self.services()?.docs.clone())
    }

    pub fn list_frameworks(&self, category: Option<&str>) -> Result<Vec<FrameworkSummary>, Error> {
        let services = self.services()?;
        let category = match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => Some(raw.parse::<Category>().map_err(Error::InvalidArgument)?),
            None => None,
        };
        let frameworks = services.docs.registry().list_by_category(category);
        Ok(frameworks.iter().map(|d| FrameworkSummary::from(d.as_ref())).collect())
    }

    pub fn search_frameworks(&self, query: &str) -> Result<Vec<RankedFramework>, Error> {
        let services = self.services()?;
        let query = require(query, "query")?;
        Ok(services.docs.registry().search(query).iter().map(RankedFramework::from).collect())
    }

    pub fn get_framework_info(&self, framework: &str) -> Result<Option<FrameworkDetail>, Error> {
        let services = self.services()?;
        let framework = require(framework, "framework")?;
        Ok(services.docs.registry().get(framework).map(|d| FrameworkDetail::from(d.as_ref())))
    }

    pub async fn get_framework_docs(&self, framework: &str, section: Option<&str>, use_cache: bool) -> Result<String, Error> {
        let services = self.services()?;
        let framework = require(framework, "framework")?;
        Ok(services.docs.get_framework_docs(framework, section, use_cache).await?.into_text())
    }

    pub async fn get_framework_examples(&self, framework: &str, pattern: Option<&str>) -> Result<String, Error> {
        let services = self.services()?;
        let framework = require(framework, "framework")?;
        Ok(services.docs.get_framework_examples(framework, pattern).await?.into_text())
    }

    /// `limit` defaults to 10 and is clamped to `1..=50`.
    pub async fn search_documentation(&self, framework: &str, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>, Error> {
        let services = self.services()?;
        let framework = require(framework, "framework")?;
        let query = require(query, "query")?;
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_RESULTS);
        services.docs.search_documentation(framework, query, limit).await
    }

    pub async fn get_framework_context(&self, frameworks: &[String], task: &str) -> Result<String, Error> {
        let services = self.services()?;
        require_list(frameworks, "frameworks")?;
        let task = require(task, "task description")?;
        services.docs.get_framework_context(frameworks, task).await
    }

    pub fn analyze_code_compatibility(&self, code: &str, frameworks: &[String]) -> Result<CompatibilityReport, Error> {
        let services = self.services()?;
        require(code, "code")?;
        require_list(frameworks, "frameworks")?;
        services.docs.analyze_code_compatibility(code, frameworks)
    }

    pub async fn check_framework_updates(&self, framework: &str) -> Result<UpdateReport, Error> {
        let services = self.services()?;
        let framework = require(framework, "framework")?;
        services.docs.check_framework_updates(framework).await
    }

    pub async fn refresh_framework_cache(&self, framework: Option<&str>, force: bool) -> Result<RefreshReport, Error> {
        let services = self.services()?;
        let framework = framework.map(|f| require(f, "framework")).transpose()?;
        services.docs.refresh_framework_cache(framework, force).await
    }

    pub fn get_cache_statistics(&self) -> Result<CacheStatistics, Error> {
        Ok(self.services()?.docs.cache().stats())
    }

    pub fn get_registry_stats(&self) -> Result<RegistryStatistics, Error> {
        Ok(self.services()?.docs.registry().stats())
    }
}
