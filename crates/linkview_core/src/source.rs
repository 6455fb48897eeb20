//! Upstream data source abstraction.
//!
//! The actual retrieval mechanism (files, network APIs) lives outside this
//! crate; builds only see the [`UpstreamSource`] trait.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rustc_hash::FxHashMap;

use crate::error::SourceError;
use crate::model::{DateWindow, Observation};

/// Supplies the ordered `(date, value)` series for an identifier.
///
/// Implementations may block (network or disk latency); they are only ever
/// called from the build worker, never from the control thread.
pub trait UpstreamSource: Send + Sync {
    fn fetch(&self, series: &str, window: &DateWindow) -> Result<Vec<Observation>, SourceError>;
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Always,
    Times(usize),
}

/// In-memory source backed by fixed tables.
///
/// Counts fetches and can be told to fail for particular series, which makes
/// it the fixture of choice for cache and binding tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    series: FxHashMap<String, Vec<Observation>>,
    failures: Mutex<FxHashMap<String, Failure>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_series(mut self, id: &str, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.date);
        self.series.insert(id.to_string(), observations);
        self
    }

    /// Make every fetch of `id` fail.
    pub fn fail_series(&self, id: &str) {
        self.lock_failures().insert(id.to_string(), Failure::Always);
    }

    /// Make the next `times` fetches of `id` fail, then recover.
    pub fn fail_series_times(&self, id: &str, times: usize) {
        self.lock_failures()
            .insert(id.to_string(), Failure::Times(times));
    }

    pub fn recover_series(&self, id: &str) {
        self.lock_failures().remove(id);
    }

    /// Total number of fetch calls, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, Failure>> {
        // A poisoned lock only means a test panicked mid-update; the map is still usable.
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl UpstreamSource for MemorySource {
    fn fetch(&self, series: &str, window: &DateWindow) -> Result<Vec<Observation>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        {
            let mut failures = self.lock_failures();
            match failures.get(series).copied() {
                Some(Failure::Always) => {
                    return Err(SourceError::new(series, "upstream unavailable"));
                }
                Some(Failure::Times(n)) if n > 0 => {
                    failures.insert(series.to_string(), Failure::Times(n - 1));
                    return Err(SourceError::new(series, "transient upstream failure"));
                }
                _ => {}
            }
        }

        let observations = self
            .series
            .get(series)
            .ok_or_else(|| SourceError::new(series, "unknown series"))?;
        Ok(observations
            .iter()
            .filter(|o| window.contains(o.date))
            .copied()
            .collect())
    }
}
