//! Background cache warming at startup.
//!
//! The warmer walks a seed list once on its own task and goes through the
//! same cache-first retrieval path as foreground requests, so a request that
//! races the warmer for the same framework joins its in-flight fetch instead
//! of issuing another one.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::cache::CacheKey;
use crate::orchestrator::DocsService;
use crate::registry::normalize_identifier;

/// Outcome counts of one warming pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmSummary {
    pub warmed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Warm each seed's default docs, skipping entries that are already fresh.
///
/// Failures are logged and counted, never returned.
pub async fn warm(service: &DocsService, seeds: &[String]) -> WarmSummary {
    let mut summary = WarmSummary::default();
    tracing::info!(frameworks = seeds.len(), "cache warming started");

    for seed in seeds {
        let id = normalize_identifier(seed);
        let Some(descriptor) = service.registry().get(&id) else {
            tracing::warn!(framework = %id, "warm target is not registered");
            summary.failed += 1;
            continue;
        };

        if service.cache().is_fresh(&CacheKey::docs(&descriptor.name, None)) {
            tracing::debug!(framework = %descriptor.name, "already fresh, not warming");
            summary.skipped += 1;
            continue;
        }

        match service.get_framework_docs(&descriptor.name, None, true).await {
            Ok(retrieved) => {
                tracing::info!(framework = %descriptor.name, origin = ?retrieved.origin, size = retrieved.content.len(), "framework warmed");
                summary.warmed += 1;
            }
            Err(err) => {
                tracing::warn!(framework = %descriptor.name, error = %err, "failed to warm framework");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(warmed = summary.warmed, skipped = summary.skipped, failed = summary.failed, "cache warming finished");
    summary
}

/// Handle to a detached warming task.
#[derive(Debug)]
pub struct Warmer {
    handle: JoinHandle<WarmSummary>,
}

impl Warmer {
    /// Start warming on a new task and return immediately.
    pub fn spawn(service: Arc<DocsService>, seeds: Vec<String>) -> Self {
        let handle = tokio::spawn(async move { warm(&service, &seeds).await });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task. Fetches it already started keep running to completion
    /// on their own tasks.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the pass to end; `None` if it was aborted or panicked.
    pub async fn join(self) -> Option<WarmSummary> {
        self.handle.await.ok()
    }
}
