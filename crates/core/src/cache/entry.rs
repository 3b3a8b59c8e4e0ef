//! Cache entries and their on-disk encoding.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::CacheKey;
use crate::provider::ProviderKind;

const FORMAT_VERSION: u32 = 1;

/// A fetched document. Never mutated once written; refreshes replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content: String,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Content length in bytes.
    pub size: usize,
    /// Provider that produced the content; its fingerprint is only
    /// comparable against the same provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
}

impl CacheEntry {
    pub fn new(content: impl Into<String>, fingerprint: Option<String>) -> Self {
        let content = content.into();
        Self { size: content.len(), content, fetched_at: Utc::now(), fingerprint, provider: None }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Age relative to `now`; entries stamped in the future count as brand new.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        age_of(self.fetched_at, now)
    }

    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) < ttl
    }
}

pub(crate) fn age_of(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - fetched_at).to_std().unwrap_or(Duration::ZERO)
}

#[derive(Serialize)]
struct StoredEntryRef<'a> {
    format: u32,
    key: &'a CacheKey,
    #[serde(flatten)]
    entry: &'a CacheEntry,
}

#[derive(Deserialize)]
struct StoredEntry {
    format: u32,
    key: CacheKey,
    #[serde(flatten)]
    entry: CacheEntry,
}

pub(crate) fn encode(key: &CacheKey, entry: &CacheEntry) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(&StoredEntryRef { format: FORMAT_VERSION, key, entry })
}

/// Decode a stored file, returning the key it was written under.
pub(crate) fn decode(bytes: &[u8]) -> Result<(CacheKey, CacheEntry), String> {
    let stored: StoredEntry = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    if stored.format != FORMAT_VERSION {
        return Err(format!("unsupported entry format {}", stored.format));
    }
    if stored.entry.size != stored.entry.content.len() {
        return Err(format!(
            "size mismatch: header says {} bytes, content has {}",
            stored.entry.size,
            stored.entry.content.len()
        ));
    }
    Ok((stored.key, stored.entry))
}
