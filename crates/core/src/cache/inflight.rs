//! Per-key in-flight fetch markers.
//!
//! The map lock guards only insertion and removal of markers. The fetch
//! itself runs outside it as a spawned task, so a dropped waiter never
//! cancels work other waiters are sharing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, Shared};

use super::entry::CacheEntry;
use super::key::CacheKey;
use crate::error::ProviderError;

/// Result of one fetch-through, shared by every waiter for the key.
#[derive(Debug, Clone)]
pub(crate) struct Fetched {
    pub entry: CacheEntry,
    pub from_upstream: bool,
}

pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<Fetched, ProviderError>>>;

#[derive(Default)]
pub(crate) struct InFlight {
    fetches: Mutex<HashMap<CacheKey, SharedFetch>>,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, SharedFetch>> {
        self.fetches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach to the fetch already running for `key`, or start one.
    ///
    /// `start` runs with the lock held so the new marker is visible before
    /// the fetch it represents can finish and clear it. It must only spawn.
    /// Returns the shared fetch and whether this caller started it.
    pub fn join_or_start(&self, key: &CacheKey, start: impl FnOnce() -> SharedFetch) -> (SharedFetch, bool) {
        let mut fetches = self.lock();
        if let Some(existing) = fetches.get(key) {
            return (existing.clone(), false);
        }
        let fetch = start();
        fetches.insert(key.clone(), fetch.clone());
        (fetch, true)
    }

    /// Clear the marker once its fetch has written through.
    pub fn finish(&self, key: &CacheKey) {
        self.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}
