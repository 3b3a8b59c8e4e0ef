//! Cache statistics counters and snapshots.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::key::ContentKind;

/// Process-wide counters, incremented concurrently from every request.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stale_hits: AtomicU64,
    pub writes: AtomicU64,
    pub write_failures: AtomicU64,
    pub evictions: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Per-framework slice of the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameworkCacheStats {
    pub entries: usize,
    pub bytes: u64,
    pub last_access: Option<DateTime<Utc>>,
    pub newest_fetch: Option<DateTime<Utc>>,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub stale_hits: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub evictions: u64,
    pub entries: usize,
    pub bytes_stored: u64,
    pub in_flight: usize,
    /// hits / (hits + misses), 0 when nothing was looked up yet.
    pub hit_rate: f64,
    pub ttl_secs: BTreeMap<ContentKind, u64>,
    pub frameworks: BTreeMap<String, FrameworkCacheStats>,
}

impl CacheStatistics {
    pub(crate) fn from_counters(
        counters: &Counters, frameworks: BTreeMap<String, FrameworkCacheStats>, ttl_secs: BTreeMap<ContentKind, u64>,
        in_flight: usize,
    ) -> Self {
        let hits = Counters::load(&counters.hits);
        let misses = Counters::load(&counters.misses);
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 };

        Self {
            hits,
            misses,
            stale_hits: Counters::load(&counters.stale_hits),
            writes: Counters::load(&counters.writes),
            write_failures: Counters::load(&counters.write_failures),
            evictions: Counters::load(&counters.evictions),
            entries: frameworks.values().map(|f| f.entries).sum(),
            bytes_stored: frameworks.values().map(|f| f.bytes).sum(),
            in_flight,
            hit_rate,
            ttl_secs,
            frameworks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_aggregates_frameworks() {
        let counters = Counters::default();
        Counters::bump(&counters.hits);
        Counters::bump(&counters.hits);
        Counters::bump(&counters.hits);
        Counters::bump(&counters.misses);
        Counters::bump(&counters.evictions);

        let mut frameworks = BTreeMap::new();
        frameworks.insert("react".to_string(), FrameworkCacheStats { entries: 2, bytes: 100, ..Default::default() });
        frameworks.insert("vue".to_string(), FrameworkCacheStats { entries: 1, bytes: 50, ..Default::default() });

        let stats = CacheStatistics::from_counters(&counters, frameworks, BTreeMap::new(), 0);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.bytes_stored, 150);
        assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_hit_rate_is_zero() {
        let stats = CacheStatistics::from_counters(&Counters::default(), BTreeMap::new(), BTreeMap::new(), 0);
        assert_eq!(stats.hit_rate, 0.0);
    }
}
