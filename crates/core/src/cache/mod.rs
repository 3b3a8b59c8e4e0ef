//! Disk-backed fetch-through cache for framework documentation.
//!
//! This module provides a persistent cache with one JSON file per key under
//! `<root>/<framework>/<kind>/<section|default>.json`. It supports:
//!
//! - Per-kind TTL freshness with a separate stale accessor for fallback
//! - Atomic temp-file-and-rename writes
//! - Per-key coalescing of concurrent fetch-throughs
//! - Hit/miss/eviction statistics

mod entry;
mod inflight;
mod key;
mod stats;
mod storage;

pub use entry::CacheEntry;
pub use key::{CacheKey, ContentKind};
pub use stats::{CacheStatistics, FrameworkCacheStats};
pub use storage::{DocumentationCache, FetchOutcome};
pub(crate) use storage::signature_of;
