//! Parameter-keyed dataset cache with LRU eviction and in-flight dedup.
//!
//! Builds are asynchronous from the control thread's point of view, so the
//! cache hands out a [`CacheLookup`] instead of building itself: `Dispatch`
//! means the caller owns the build and must report it back through
//! [`DatasetCache::complete`]; `Pending` means someone else already does.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use rustc_hash::FxHashSet;

use crate::error::{DashboardError, Result};
use crate::model::{DerivedDataset, ParameterSet};

/// Default number of datasets kept.
pub const DEFAULT_CAPACITY: usize = 128;

/// Outcome of [`DatasetCache::begin`].
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Cached; the entry is now the most recently used
    Hit(Arc<DerivedDataset>),
    /// A build for this key is already in flight
    Pending,
    /// Not cached and not in flight; the caller must build it
    Dispatch,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Requests folded into an in-flight build
    pub deduplicated: u64,
    /// Entries dropped after failing their integrity check
    pub corruptions: u64,
}

pub struct DatasetCache {
    entries: LruCache<ParameterSet, Arc<DerivedDataset>>,
    in_flight: FxHashSet<ParameterSet>,
    stats: CacheStats,
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DatasetCache {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            in_flight: FxHashSet::default(),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Whether `key` is cached, without touching its recency.
    pub fn contains(&self, key: &ParameterSet) -> bool {
        self.entries.contains(key)
    }

    pub fn is_in_flight(&self, key: &ParameterSet) -> bool {
        self.in_flight.contains(key)
    }

    /// Look `key` up, marking it in flight on a miss.
    pub fn begin(&mut self, key: &ParameterSet) -> CacheLookup {
        let cached = self
            .entries
            .get(key)
            .map(|dataset| (dataset.clone(), verify(key, dataset)));

        match cached {
            Some((dataset, Ok(()))) => {
                self.stats.hits += 1;
                tracing::debug!(params = %key, "Dataset cache hit");
                return CacheLookup::Hit(dataset);
            }
            Some((_, Err(reason))) => {
                let err = DashboardError::CacheCorruption(reason);
                tracing::error!(params = %key, error = %err, "Dropping corrupt cache entry");
                self.entries.pop(key);
                self.stats.corruptions += 1;
            }
            None => {}
        }

        if self.in_flight.contains(key) {
            self.stats.deduplicated += 1;
            tracing::debug!(params = %key, "Build already in flight");
            return CacheLookup::Pending;
        }

        self.stats.misses += 1;
        self.in_flight.insert(key.clone());
        CacheLookup::Dispatch
    }

    /// Record the outcome of a dispatched build. Successful datasets are
    /// inserted whether or not they are still wanted by the views.
    pub fn complete(
        &mut self,
        key: &ParameterSet,
        result: Result<DerivedDataset>,
    ) -> Result<Arc<DerivedDataset>> {
        self.in_flight.remove(key);
        let dataset = Arc::new(result?);

        if let Err(reason) = verify(key, &dataset) {
            self.stats.corruptions += 1;
            tracing::error!(params = %key, reason = %reason, "Refusing to cache malformed dataset");
            return Err(DashboardError::CacheCorruption(reason));
        }

        if let Some((evicted, _)) = self.entries.push(key.clone(), dataset.clone()) {
            if &evicted != key {
                self.stats.evictions += 1;
                tracing::debug!(evicted = %evicted, "Evicted least recently used dataset");
            }
        }
        Ok(dataset)
    }

    /// Forget an in-flight mark without caching anything.
    pub fn abandon(&mut self, key: &ParameterSet) {
        self.in_flight.remove(key);
    }

    /// Synchronous lookup-or-build. Repeated calls for one key build once.
    pub fn get_or_build<F>(&mut self, key: &ParameterSet, build: F) -> Result<Arc<DerivedDataset>>
    where
        F: FnOnce(&ParameterSet) -> Result<DerivedDataset>,
    {
        match self.begin(key) {
            CacheLookup::Hit(dataset) => Ok(dataset),
            // A synchronous caller cannot wait on someone else's build; it
            // builds inline and the later completion simply refreshes the entry.
            CacheLookup::Dispatch | CacheLookup::Pending => {
                let result = build(key);
                self.complete(key, result)
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, key: ParameterSet, dataset: DerivedDataset) {
        self.entries.push(key, Arc::new(dataset));
    }
}

fn verify(key: &ParameterSet, dataset: &DerivedDataset) -> std::result::Result<(), String> {
    if dataset.parameters() != key {
        return Err(format!(
            "entry built for [{}] stored under [{key}]",
            dataset.parameters()
        ));
    }
    dataset.check_invariants()
}
