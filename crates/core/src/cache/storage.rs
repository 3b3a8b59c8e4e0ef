//! Disk-backed documentation cache.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::FutureExt;
use sha2::{Digest, Sha256};

use super::entry::{self, CacheEntry, age_of};
use super::inflight::{Fetched, InFlight};
use super::key::{CacheKey, ContentKind};
use super::stats::{CacheStatistics, Counters, FrameworkCacheStats};
use crate::config::TtlConfig;
use crate::error::{CacheError, ProviderError};

/// What the index remembers about an entry without reading its file.
#[derive(Debug, Clone)]
struct EntryMeta {
    fetched_at: DateTime<Utc>,
    size: usize,
}

impl From<&CacheEntry> for EntryMeta {
    fn from(entry: &CacheEntry) -> Self {
        Self { fetched_at: entry.fetched_at, size: entry.size }
    }
}

/// Outcome of [`DocumentationCache::fetch_through`].
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub entry: CacheEntry,
    /// The entry came from the upstream rather than a fresh cached copy.
    pub from_upstream: bool,
}

struct Inner {
    root: PathBuf,
    ttl: TtlConfig,
    index: RwLock<BTreeMap<CacheKey, EntryMeta>>,
    last_access: Mutex<HashMap<String, DateTime<Utc>>>,
    counters: Counters,
    inflight: InFlight,
    tmp_seq: AtomicU64,
}

/// Fetch-through cache keyed by [`CacheKey`], one JSON file per key.
///
/// Cloning is cheap; all clones share the same index, counters and
/// in-flight markers. Every method is safe to call concurrently.
#[derive(Clone)]
pub struct DocumentationCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DocumentationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentationCache").field("root", &self.inner.root).finish_non_exhaustive()
    }
}

impl DocumentationCache {
    /// Open (creating if needed) a cache rooted at `root`.
    ///
    /// Existing entries are indexed and temp files left by interrupted
    /// writes are removed.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the root cannot be created or written.
    pub fn open(root: impl Into<PathBuf>, ttl: TtlConfig) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CacheError::io(&root, e))?;

        let probe = root.join(format!(".write-probe-{}", std::process::id()));
        fs::write(&probe, b"ok").map_err(|e| CacheError::io(&root, e))?;
        fs::remove_file(&probe).map_err(|e| CacheError::io(&probe, e))?;

        let index = scan(&root);
        tracing::info!(root = %root.display(), entries = index.len(), "documentation cache opened");

        Ok(Self {
            inner: Arc::new(Inner {
                root,
                ttl,
                index: RwLock::new(index),
                last_access: Mutex::new(HashMap::new()),
                counters: Counters::default(),
                inflight: InFlight::default(),
                tmp_seq: AtomicU64::new(0),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn ttl(&self, kind: ContentKind) -> Duration {
        self.inner.ttl.for_kind(kind)
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.inner.root.join(key.relative_path())
    }

    /// Fresh entry for `key`, or `None` if absent or older than its TTL.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.touch(&key.framework);

        if !self.is_fresh(key) {
            Counters::bump(&self.inner.counters.misses);
            tracing::debug!(key = %key, "cache miss");
            return None;
        }

        match self.read(key).await {
            Some(entry) if entry.is_fresh(self.ttl(key.kind), Utc::now()) => {
                Counters::bump(&self.inner.counters.hits);
                tracing::debug!(key = %key, "cache hit");
                Some(entry)
            }
            _ => {
                Counters::bump(&self.inner.counters.misses);
                tracing::debug!(key = %key, "cache miss");
                None
            }
        }
    }

    /// Entry for `key` regardless of age. Used only by serve-stale fallback.
    pub async fn get_stale_allowed(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.touch(&key.framework);
        let entry = self.read(key).await?;
        Counters::bump(&self.inner.counters.stale_hits);
        Some(entry)
    }

    /// Entry for `key` regardless of age, without touching statistics.
    pub async fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.read(key).await
    }

    /// Whether a fresh entry exists, judged from the index alone.
    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        let index = self.inner.index.read().unwrap_or_else(PoisonError::into_inner);
        index.get(key).is_some_and(|meta| age_of(meta.fetched_at, Utc::now()) < self.ttl(key.kind))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.index.read().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    /// Atomically write `entry` under `key`, replacing any previous entry.
    ///
    /// The entry is written to a temp file beside its final path and
    /// renamed into place, so readers see either the old or the new file.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file cannot be written. The previous
    /// entry, if any, is left untouched.
    pub async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let result = self.write(key, entry).await;
        match &result {
            Ok(()) => {
                self.inner
                    .index
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.clone(), EntryMeta::from(entry));
                Counters::bump(&self.inner.counters.writes);
                self.touch(&key.framework);
                tracing::debug!(key = %key, size = entry.size, "cache entry written");
            }
            Err(_) => Counters::bump(&self.inner.counters.write_failures),
        }
        result
    }

    async fn write(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let bytes = entry::encode(key, entry)
            .map_err(|e| CacheError::CorruptEntry { path: path.clone(), reason: e.to_string() })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| CacheError::io(parent, e))?;
        }

        let seq = self.inner.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.{}.{seq}.tmp", std::process::id()));

        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::io(&tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::io(&path, e));
        }
        Ok(())
    }

    async fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        if !self.contains(key) {
            return None;
        }

        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, path = %path.display(), error = %e, "cache file unreadable, dropping entry");
                self.forget(key);
                return None;
            }
        };

        match entry::decode(&bytes) {
            Ok((stored_key, entry)) if stored_key == *key => Some(entry),
            Ok((stored_key, _)) => {
                let err = CacheError::CorruptEntry { path, reason: format!("file holds entry for {stored_key}") };
                tracing::warn!(key = %key, error = %err, "dropping corrupt cache entry");
                self.forget(key);
                None
            }
            Err(reason) => {
                let err = CacheError::CorruptEntry { path: path.clone(), reason };
                tracing::warn!(key = %key, error = %err, "dropping corrupt cache entry");
                self.forget(key);
                let _ = tokio::fs::remove_file(&path).await;
                None
            }
        }
    }

    fn forget(&self, key: &CacheKey) -> bool {
        self.inner.index.write().unwrap_or_else(PoisonError::into_inner).remove(key).is_some()
    }

    fn touch(&self, framework: &str) {
        self.inner
            .last_access
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(framework.to_string(), Utc::now());
    }

    /// Remove the entry for `key`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file exists but cannot be removed.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let existed = self.forget(key);
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::io(&path, e)),
        }
        if existed {
            Counters::bump(&self.inner.counters.evictions);
            tracing::debug!(key = %key, "cache entry invalidated");
        }
        Ok(existed)
    }

    /// Remove every entry of one kind for a framework.
    pub async fn invalidate_kind(&self, framework: &str, kind: ContentKind) -> Result<usize, CacheError> {
        let mut removed = 0;
        for key in self.keys_for(framework, kind) {
            if self.invalidate(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drop expired entries of one kind for a framework, then the oldest
    /// ones until at most `keep` remain.
    pub async fn prune_kind(&self, framework: &str, kind: ContentKind, keep: usize) -> Result<usize, CacheError> {
        let framework = crate::registry::normalize_identifier(framework);
        let ttl = self.ttl(kind);
        let now = Utc::now();
        let doomed: Vec<CacheKey> = {
            let index = self.inner.index.read().unwrap_or_else(PoisonError::into_inner);
            let mut live = Vec::new();
            let mut doomed = Vec::new();
            for (key, meta) in index.iter().filter(|(k, _)| k.framework == framework && k.kind == kind) {
                if age_of(meta.fetched_at, now) >= ttl {
                    doomed.push(key.clone());
                } else {
                    live.push((meta.fetched_at, key.clone()));
                }
            }
            live.sort_by(|a, b| b.0.cmp(&a.0));
            doomed.extend(live.into_iter().skip(keep).map(|(_, key)| key));
            doomed
        };

        let mut removed = 0;
        for key in doomed {
            if self.invalidate(&key).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(framework = %framework, kind = %kind, removed, "pruned cache entries");
        }
        Ok(removed)
    }

    /// Digest of which entries of one kind a framework has and when each was
    /// fetched. Any write or removal of such an entry changes it.
    pub fn signature(&self, framework: &str, kind: ContentKind) -> String {
        let framework = crate::registry::normalize_identifier(framework);
        let index = self.inner.index.read().unwrap_or_else(PoisonError::into_inner);
        signature_of(
            index
                .iter()
                .filter(|(k, _)| k.framework == framework && k.kind == kind)
                .map(|(k, meta)| (k, meta.fetched_at)),
        )
    }

    /// Keys of one kind cached for a framework, in section order.
    pub fn keys_for(&self, framework: &str, kind: ContentKind) -> Vec<CacheKey> {
        let framework = crate::registry::normalize_identifier(framework);
        let index = self.inner.index.read().unwrap_or_else(PoisonError::into_inner);
        index.keys().filter(|k| k.framework == framework && k.kind == kind).cloned().collect()
    }

    pub fn stats(&self) -> CacheStatistics {
        let mut frameworks: BTreeMap<String, FrameworkCacheStats> = BTreeMap::new();
        {
            let index = self.inner.index.read().unwrap_or_else(PoisonError::into_inner);
            for (key, meta) in index.iter() {
                let slot = frameworks.entry(key.framework.clone()).or_default();
                slot.entries += 1;
                slot.bytes += meta.size as u64;
                slot.newest_fetch = slot.newest_fetch.max(Some(meta.fetched_at));
            }
        }
        {
            let last_access = self.inner.last_access.lock().unwrap_or_else(PoisonError::into_inner);
            for (framework, at) in last_access.iter() {
                frameworks.entry(framework.clone()).or_default().last_access = Some(*at);
            }
        }

        let ttl_secs = ContentKind::ALL.into_iter().map(|kind| (kind, self.ttl(kind).as_secs())).collect();
        CacheStatistics::from_counters(&self.inner.counters, frameworks, ttl_secs, self.inner.inflight.len())
    }

    /// Resolve `key` through the cache, calling `fetch` at most once across
    /// all concurrent callers for the same key.
    ///
    /// With `use_cache`, a fresh entry found when the fetch task starts is
    /// returned without calling upstream. The fetch runs in its own task and
    /// writes through before any waiter is released; a failed write is
    /// logged and the fetched entry is still returned. A docs write also
    /// drops the framework's search-index entries, even if every waiter
    /// has gone away.
    pub async fn fetch_through<F, Fut>(&self, key: &CacheKey, use_cache: bool, fetch: F) -> Result<FetchOutcome, ProviderError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<CacheEntry, ProviderError>> + Send + 'static,
    {
        let (shared, started) = self.inner.inflight.join_or_start(key, || {
            let cache = self.clone();
            let task_key = key.clone();
            let task = tokio::spawn(async move { cache.run_fetch(task_key, use_cache, fetch).await });
            async move {
                task.await
                    .unwrap_or_else(|e| Err(ProviderError::TransientNetwork(format!("fetch task failed: {e}"))))
            }
            .boxed()
            .shared()
        });

        if !started {
            tracing::debug!(key = %key, "joined in-flight fetch");
        }

        let Fetched { entry, from_upstream } = shared.await?;
        Ok(FetchOutcome { entry, from_upstream })
    }

    async fn run_fetch<F, Fut>(self, key: CacheKey, use_cache: bool, fetch: F) -> Result<Fetched, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheEntry, ProviderError>>,
    {
        let result = self.fetch_or_reuse(&key, use_cache, fetch).await;
        self.inner.inflight.finish(&key);
        result
    }

    async fn fetch_or_reuse<F, Fut>(&self, key: &CacheKey, use_cache: bool, fetch: F) -> Result<Fetched, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheEntry, ProviderError>>,
    {
        if use_cache
            && self.is_fresh(key)
            && let Some(entry) = self.peek(key).await
        {
            return Ok(Fetched { entry, from_upstream: false });
        }

        tracing::debug!(key = %key, "fetching from upstream");
        let entry = fetch().await?;
        if let Err(err) = self.put(key, &entry).await {
            tracing::warn!(key = %key, error = %err, "failed to persist fetched entry; serving it uncached");
        }
        if key.kind == ContentKind::Docs {
            match self.invalidate_kind(&key.framework, ContentKind::SearchIndex).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(framework = %key.framework, removed, "search index invalidated"),
                Err(err) => tracing::warn!(framework = %key.framework, error = %err, "failed to invalidate search index"),
            }
        }
        Ok(Fetched { entry, from_upstream: true })
    }
}

/// Order-sensitive digest of `(key, fetched_at)` pairs.
pub(crate) fn signature_of<'a>(entries: impl IntoIterator<Item = (&'a CacheKey, DateTime<Utc>)>) -> String {
    let mut hasher = Sha256::new();
    for (key, fetched_at) in entries {
        hasher.update(key.section.as_bytes());
        hasher.update([0u8]);
        hasher.update(fetched_at.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
        hasher.update([b'\n']);
    }
    hex::encode(hasher.finalize())
}

/// Rebuild the index from disk, deleting leftovers of interrupted writes
/// and files that do not decode to the key their path implies.
fn scan(root: &Path) -> BTreeMap<CacheKey, EntryMeta> {
    let mut index = BTreeMap::new();
    let mut files = Vec::new();
    collect_files(root, 0, &mut files);

    for path in files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if name.ends_with(".tmp") {
            tracing::debug!(path = %path.display(), "removing orphaned temp file");
            let _ = fs::remove_file(&path);
            continue;
        }
        if !name.ends_with(".json") {
            continue;
        }

        let decoded = fs::read(&path).map_err(|e| e.to_string()).and_then(|bytes| entry::decode(&bytes));
        match decoded {
            Ok((key, entry)) if root.join(key.relative_path()) == path => {
                index.insert(key, EntryMeta::from(&entry));
            }
            Ok((key, _)) => {
                tracing::warn!(path = %path.display(), key = %key, "cache file is not at its key's path, removing");
                let _ = fs::remove_file(&path);
            }
            Err(reason) => {
                let err = CacheError::CorruptEntry { path: path.clone(), reason };
                tracing::warn!(error = %err, "removing corrupt cache file");
                let _ = fs::remove_file(&path);
            }
        }
    }
    index
}

/// Files at depth 3 (`framework/kind/file`) plus temp files anywhere above.
fn collect_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if depth < 2 {
                collect_files(&path, depth + 1, out);
            }
        } else if depth == 2 || path.extension().is_some_and(|ext| ext == "tmp") {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> DocumentationCache {
        DocumentationCache::open(dir.path(), TtlConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_returns_entry() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", Some("hooks"));
        let entry = CacheEntry::new("# Hooks\n\nuseState", Some("sha-1".into()));

        cache.put(&key, &entry).await.unwrap();
        assert_eq!(cache.get(&key).await, Some(entry));
        assert!(dir.path().join("react/docs/hooks.json").is_file());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_needs_stale_accessor() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", None);
        let old = CacheEntry::new("old docs", None).with_fetched_at(Utc::now() - chrono::Duration::days(2));

        cache.put(&key, &old).await.unwrap();
        assert!(!cache.is_fresh(&key));
        assert_eq!(cache.get(&key).await, None);
        assert_eq!(cache.get_stale_allowed(&key).await, Some(old));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stale_hits, 1);
    }

    #[tokio::test]
    async fn test_peek_has_no_stat_side_effects() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", None);
        cache.put(&key, &CacheEntry::new("docs", None)).await.unwrap();

        assert!(cache.peek(&key).await.is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses + stats.stale_hits, 0);
    }

    #[tokio::test]
    async fn test_reopen_rebuilds_index_and_removes_temp_files() {
        let dir = TempDir::new().unwrap();
        let key = CacheKey::examples("vue", Some("forms"));
        {
            let cache = open(&dir);
            cache.put(&key, &CacheEntry::new("<form>", None)).await.unwrap();
        }
        let orphan = dir.path().join("vue/examples/.forms.json.1.0.tmp");
        fs::write(&orphan, b"partial").unwrap();

        let cache = open(&dir);
        assert!(!orphan.exists());
        assert_eq!(cache.get(&key).await.map(|e| e.content), Some("<form>".to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_dropped_on_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("react/docs/default.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{ truncated").unwrap();

        let cache = open(&dir);
        assert!(!path.exists());
        assert_eq!(cache.stats().entries, 0);
    }

    #[tokio::test]
    async fn test_open_fails_when_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        let result = DocumentationCache::open(&file, TtlConfig::default());
        assert!(matches!(result, Err(CacheError::Io { .. })));
    }

    #[tokio::test]
    async fn test_invalidate_single_and_by_kind() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        for section in [None, Some("hooks"), Some("state")] {
            cache.put(&CacheKey::docs("react", section), &CacheEntry::new("x", None)).await.unwrap();
        }
        cache.put(&CacheKey::search_index("react", "state"), &CacheEntry::new("[]", None)).await.unwrap();

        let keys = cache.keys_for("react", ContentKind::Docs);
        assert_eq!(keys.len(), 3);
        assert!(keys[0].is_default_section());

        assert!(cache.invalidate(&CacheKey::docs("react", Some("hooks"))).await.unwrap());
        assert!(!cache.invalidate(&CacheKey::docs("react", Some("hooks"))).await.unwrap());
        assert_eq!(cache.invalidate_kind("react", ContentKind::SearchIndex).await.unwrap(), 1);
        assert_eq!(cache.stats().evictions, 2);
        assert_eq!(cache.stats().entries, 2);
    }

    #[tokio::test]
    async fn test_prune_kind_drops_expired_then_oldest() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let now = Utc::now();
        let expired = CacheEntry::new("[]", None).with_fetched_at(now - chrono::Duration::hours(2));
        cache.put(&CacheKey::search_index("react", "old"), &expired).await.unwrap();
        for (i, query) in ["a", "b", "c", "d"].into_iter().enumerate() {
            let entry = CacheEntry::new("[]", None).with_fetched_at(now - chrono::Duration::minutes(10 - i as i64));
            cache.put(&CacheKey::search_index("react", query), &entry).await.unwrap();
        }
        cache.put(&CacheKey::docs("react", None), &CacheEntry::new("docs", None)).await.unwrap();

        assert_eq!(cache.prune_kind("react", ContentKind::SearchIndex, 2).await.unwrap(), 3);
        let left: Vec<String> = cache.keys_for("react", ContentKind::SearchIndex).into_iter().map(|k| k.section).collect();
        assert_eq!(left, ["c", "d"]);
        assert!(cache.contains(&CacheKey::docs("react", None)));
        assert!(!dir.path().join("react/search-index/old.json").exists());
    }

    #[tokio::test]
    async fn test_signature_tracks_writes_and_removals() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", None);
        let empty = cache.signature("react", ContentKind::Docs);

        let entry = CacheEntry::new("v1", None);
        cache.put(&key, &entry).await.unwrap();
        let first = cache.signature("React", ContentKind::Docs);
        assert_ne!(first, empty);
        assert_eq!(first, signature_of([(&key, entry.fetched_at)]));

        let later = CacheEntry::new("v2", None).with_fetched_at(entry.fetched_at + chrono::Duration::seconds(1));
        cache.put(&key, &later).await.unwrap();
        assert_ne!(cache.signature("react", ContentKind::Docs), first);

        cache.invalidate(&key).await.unwrap();
        assert_eq!(cache.signature("react", ContentKind::Docs), empty);
    }

    #[tokio::test]
    async fn test_stats_per_framework() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        cache.put(&CacheKey::docs("react", None), &CacheEntry::new("abcd", None)).await.unwrap();
        cache.put(&CacheKey::examples("react", None), &CacheEntry::new("ef", None)).await.unwrap();

        let stats = cache.stats();
        let react = &stats.frameworks["react"];
        assert_eq!(react.entries, 2);
        assert_eq!(react.bytes, 6);
        assert!(react.last_access.is_some());
        assert_eq!(stats.ttl_secs[&ContentKind::Docs], 21_600);
    }

    #[tokio::test]
    async fn test_fetch_through_coalesces_concurrent_callers() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", None);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            let key = key.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .fetch_through(&key, true, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(CacheEntry::new("shared docs", None))
                    })
                    .await
            }));
        }

        let mut contents = Vec::new();
        for handle in handles {
            contents.push(handle.await.unwrap().unwrap().entry.content);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(contents.iter().all(|c| c == "shared docs"));
        assert_eq!(cache.stats().in_flight, 0);
        assert!(cache.is_fresh(&key));
    }

    #[tokio::test]
    async fn test_fetch_through_uses_fresh_entry() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", None);
        cache.put(&key, &CacheEntry::new("cached", None)).await.unwrap();

        let outcome = cache
            .fetch_through(&key, true, || async { Err(ProviderError::TransientNetwork("not called".into())) })
            .await
            .unwrap();
        assert!(!outcome.from_upstream);
        assert_eq!(outcome.entry.content, "cached");

        let forced = cache.fetch_through(&key, false, || async { Ok(CacheEntry::new("refetched", None)) }).await.unwrap();
        assert!(forced.from_upstream);
        assert_eq!(cache.peek(&key).await.unwrap().content, "refetched");
    }

    #[tokio::test]
    async fn test_fetch_through_error_keeps_previous_entry() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", None);
        cache.put(&key, &CacheEntry::new("previous", None)).await.unwrap();

        let err = cache
            .fetch_through(&key, false, || async { Err(ProviderError::Timeout("slow".into())) })
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Timeout("slow".into()));
        assert_eq!(cache.peek(&key).await.unwrap().content, "previous");
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_cancel_fetch() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", None);

        let waiter = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .fetch_through(&key, true, || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(CacheEntry::new("survived", None))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        waiter.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.peek(&key).await.map(|e| e.content), Some("survived".to_string()));
    }

    #[tokio::test]
    async fn test_docs_write_drops_search_index_without_waiters() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::docs("react", None);
        let memo = CacheKey::search_index("react", "hooks");
        cache.put(&memo, &CacheEntry::new("[]", None)).await.unwrap();

        let waiter = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .fetch_through(&key, false, || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(CacheEntry::new("new docs", None))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        waiter.abort();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.peek(&key).await.map(|e| e.content), Some("new docs".to_string()));
        assert!(!cache.contains(&memo));
        assert!(!dir.path().join("react/search-index/hooks.json").exists());
    }

    #[tokio::test]
    async fn test_examples_write_keeps_search_index() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let memo = CacheKey::search_index("react", "hooks");
        cache.put(&memo, &CacheEntry::new("[]", None)).await.unwrap();

        cache
            .fetch_through(&CacheKey::examples("react", None), false, || async { Ok(CacheEntry::new("```js\n```", None)) })
            .await
            .unwrap();
        assert!(cache.contains(&memo));
    }
}
