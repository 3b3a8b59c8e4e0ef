//! Cache refresh and upstream update checks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::DocsService;
use crate::cache::CacheKey;
use crate::error::Error;
use crate::provider::FreshnessStatus;
use crate::registry::FrameworkDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Success { fetched_at: DateTime<Utc> },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkRefresh {
    pub framework: String,
    #[serde(flatten)]
    pub outcome: RefreshOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub forced: bool,
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<FrameworkRefresh>,
}

impl RefreshReport {
    fn new(forced: bool, results: Vec<FrameworkRefresh>) -> Self {
        let count = |f: fn(&RefreshOutcome) -> bool| results.iter().filter(|r| f(&r.outcome)).count();
        Self {
            forced,
            total: results.len(),
            succeeded: count(|o| matches!(o, RefreshOutcome::Success { .. })),
            skipped: count(|o| matches!(o, RefreshOutcome::Skipped { .. })),
            failed: count(|o| matches!(o, RefreshOutcome::Failed { .. })),
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateStatus {
    UpToDate,
    UpdateAvailable { fingerprint: String },
    /// The upstream exposes no comparable signal; only the TTL applies.
    UnknownFreshness,
}

/// Upstream change check for a framework's default docs.
///
/// Informational only: a fresh entry stays authoritative until its TTL
/// expires even when the upstream reports a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub framework: String,
    #[serde(flatten)]
    pub status: UpdateStatus,
    pub cached_fingerprint: Option<String>,
    pub cached_at: Option<DateTime<Utc>>,
    pub ttl_expired: bool,
    pub checked_at: DateTime<Utc>,
}

impl DocsService {
    /// Refresh one framework's default docs, or every registered framework.
    ///
    /// Without `force`, fresh entries are skipped. A refresh overwrites the
    /// cached copy atomically and never removes it first, so a failed
    /// refresh leaves the previous entry in place. Per-framework failures
    /// are reported, not raised.
    ///
    /// # Errors
    ///
    /// `FrameworkNotFound` when a named framework is not registered.
    pub async fn refresh_framework_cache(&self, framework: Option<&str>, force: bool) -> Result<RefreshReport, Error> {
        let targets = match framework {
            Some(name) => vec![self.resolve(name)?],
            None => self.registry.list_by_category(None),
        };

        let mut results = Vec::with_capacity(targets.len());
        for descriptor in targets {
            let outcome = self.refresh_one(&descriptor, force).await;
            match &outcome {
                RefreshOutcome::Failed { reason } => {
                    tracing::warn!(framework = %descriptor.name, reason = %reason, "cache refresh failed")
                }
                other => tracing::debug!(framework = %descriptor.name, outcome = ?other, "cache refresh"),
            }
            results.push(FrameworkRefresh { framework: descriptor.name.clone(), outcome });
        }

        let report = RefreshReport::new(force, results);
        tracing::info!(
            forced = force,
            total = report.total,
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed,
            "cache refresh complete"
        );
        Ok(report)
    }

    async fn refresh_one(&self, descriptor: &Arc<FrameworkDescriptor>, force: bool) -> RefreshOutcome {
        let key = CacheKey::docs(&descriptor.name, None);
        if !force && self.cache.is_fresh(&key) {
            return RefreshOutcome::Skipped { reason: "cache entry is fresh".into() };
        }

        let providers = self.providers_for(descriptor, key.kind);
        if providers.is_empty() {
            return RefreshOutcome::Failed { reason: "no configured provider".into() };
        }

        match self.fetch_through(&key, descriptor.clone(), providers, !force).await {
            Ok(retrieved) => RefreshOutcome::Success { fetched_at: retrieved.fetched_at },
            Err(err) => RefreshOutcome::Failed { reason: err.to_string() },
        }
    }

    /// Ask the provider that produced the cached docs whether they changed
    /// since its fingerprint. Without a cached copy the primary provider is
    /// asked; a copy from a provider that is no longer configured reports
    /// unknown freshness.
    ///
    /// # Errors
    ///
    /// `FrameworkNotFound`, `AllSourcesFailed` when no provider is
    /// configured, or the provider's own error.
    pub async fn check_framework_updates(&self, framework: &str) -> Result<UpdateReport, Error> {
        let descriptor = self.resolve(framework)?;
        let key = CacheKey::docs(&descriptor.name, None);

        let providers = self.providers_for(&descriptor, key.kind);
        if providers.is_empty() {
            return Err(Error::AllSourcesFailed { framework: descriptor.name.clone(), reason: "no configured provider".into() });
        }

        let cached = self.cache.peek(&key).await;
        let cached_fingerprint = cached.as_ref().and_then(|e| e.fingerprint.clone());
        let origin = cached.as_ref().and_then(|e| e.provider);
        let provider = match origin {
            Some(kind) => providers.into_iter().find(|p| p.kind() == kind),
            None => providers.into_iter().next(),
        };

        let freshness = match provider {
            Some(provider) => provider.check_freshness(&descriptor, cached_fingerprint.as_deref()).await?,
            None => {
                tracing::debug!(framework = %descriptor.name, provider = ?origin, "cached docs came from an unconfigured provider");
                FreshnessStatus::Unknown
            }
        };

        let status = match freshness {
            FreshnessStatus::Unchanged => UpdateStatus::UpToDate,
            FreshnessStatus::Changed(fingerprint) => UpdateStatus::UpdateAvailable { fingerprint },
            FreshnessStatus::Unknown => UpdateStatus::UnknownFreshness,
        };

        Ok(UpdateReport {
            framework: descriptor.name.clone(),
            status,
            cached_at: cached.as_ref().map(|e| e.fetched_at),
            ttl_expired: cached.is_some() && !self.cache.is_fresh(&key),
            cached_fingerprint,
            checked_at: Utc::now(),
        })
    }
}
