//! Dataset builds: upstream fetches with bounded retry, then the recipe.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{DashboardError, Result, SourceError};
use crate::model::{DerivedDataset, Observation, ParameterSet};
use crate::recipes::{DatasetRecipe, FetchedSeries, SeriesRequest};
use crate::source::UpstreamSource;

/// How often, and how patiently, a failed upstream fetch is retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first
    pub attempts: u32,
    pub initial_backoff: Duration,
    /// Factor applied to the backoff after each failed attempt
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            attempts: 1,
            initial_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        self.initial_backoff.mul_f64(factor)
    }
}

/// Produces a [`DerivedDataset`] for a parameter set.
///
/// Given a fixed upstream state the output is a pure function of the
/// parameters. Builds may block on upstream latency and backoff, so they run
/// on the build worker.
pub struct DatasetBuilder {
    source: Arc<dyn UpstreamSource>,
    recipe: Arc<dyn DatasetRecipe>,
    retry: RetryPolicy,
    builds: AtomicUsize,
}

impl DatasetBuilder {
    pub fn new(source: Arc<dyn UpstreamSource>, recipe: Arc<dyn DatasetRecipe>) -> Self {
        Self {
            source,
            recipe,
            retry: RetryPolicy::default(),
            builds: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn recipe(&self) -> &Arc<dyn DatasetRecipe> {
        &self.recipe
    }

    /// Number of times [`build`](Self::build) has been invoked.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn build(&self, params: &ParameterSet) -> Result<DerivedDataset> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        let fetched = self
            .recipe
            .requests(params)?
            .into_iter()
            .map(|request| {
                let observations = self.fetch_with_retry(&request)?;
                Ok(FetchedSeries {
                    id: request.id,
                    observations,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let dataset = self.recipe.derive(params, fetched)?;
        tracing::info!(
            recipe = self.recipe.name(),
            params = %params,
            rows = dataset.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Dataset built"
        );
        Ok(dataset)
    }

    fn fetch_with_retry(&self, request: &SeriesRequest) -> Result<Vec<Observation>> {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = SourceError::new(request.id.as_str(), "not attempted");

        for attempt in 1..=attempts {
            match self.source.fetch(&request.id, &request.window) {
                Ok(observations) => return Ok(observations),
                Err(e) => {
                    tracing::warn!(
                        series = %request.id,
                        attempt,
                        attempts,
                        error = %e,
                        "Upstream fetch failed"
                    );
                    last_error = e;
                }
            }
            if attempt < attempts {
                thread::sleep(self.retry.backoff(attempt));
            }
        }

        Err(DashboardError::from(last_error))
    }
}
