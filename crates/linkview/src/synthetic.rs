//! Deterministic synthetic upstream data.
//!
//! Stands in for a market data or public health API. Every series is a pure
//! function of `(seed, series id, window)`, so repeated fetches agree and
//! builds stay reproducible.

use std::hash::{Hash, Hasher};
use std::thread;
use std::time::Duration;

use jiff::civil::{Date, Weekday};
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use rustc_hash::{FxHashSet, FxHasher};

use linkview_core::model::{DateWindow, Observation};
use linkview_core::{SourceError, UpstreamSource};

/// Mean daily log return and volatility of synthetic prices
const PRICE_DRIFT: f64 = 0.0005;
const PRICE_VOLATILITY: f64 = 0.02;

#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    seed: u64,
    latency: Duration,
    unavailable: FxHashSet<String>,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Sleep this long in every fetch
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every fetch of these series fail
    #[must_use]
    pub fn with_unavailable<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unavailable.extend(ids.into_iter().map(Into::into));
        self
    }

    fn rng_for(&self, series: &str) -> StdRng {
        let mut hasher = FxHasher::default();
        self.seed.hash(&mut hasher);
        series.hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }

    /// Geometric random walk on weekdays.
    fn prices(&self, series: &str, window: &DateWindow) -> Result<Vec<Observation>, SourceError> {
        let mut rng = self.rng_for(series);
        let returns = Normal::new(PRICE_DRIFT, PRICE_VOLATILITY)
            .map_err(|e| SourceError::new(series, e.to_string()))?;

        let mut price = 20.0 + rng.random::<f64>() * 480.0;
        Ok(days(window)
            .filter(|d| !matches!(d.weekday(), Weekday::Saturday | Weekday::Sunday))
            .map(|date| {
                price *= returns.sample(&mut rng).exp();
                Observation::new(date, price)
            })
            .collect())
    }

    /// Cumulative daily counts for `"<region>/<metric>"` series.
    fn counts(&self, series: &str, window: &DateWindow) -> Result<Vec<Observation>, SourceError> {
        let metric = series.rsplit('/').next().unwrap_or_default();
        let daily_mean: f64 = match metric {
            "Total_Cases" => 120.0,
            "Total_Recovered" => 100.0,
            "Total_Active_Cases" => 20.0,
            "Total_Deaths" => 3.0,
            _ => 10.0,
        };
        let mut rng = self.rng_for(series);
        let daily = Normal::new(daily_mean, daily_mean / 2.0)
            .map_err(|e| SourceError::new(series, e.to_string()))?;

        let mut total = 0.0;
        Ok(days(window)
            .map(|date| {
                total += daily.sample(&mut rng).max(0.0).round();
                Observation::new(date, total)
            })
            .collect())
    }
}

/// Every calendar day in the window, inclusive.
fn days(window: &DateWindow) -> impl Iterator<Item = Date> + '_ {
    std::iter::successors(Some(window.start), |d| d.tomorrow().ok())
        .take_while(|d| *d <= window.end)
}

impl UpstreamSource for SyntheticSource {
    fn fetch(&self, series: &str, window: &DateWindow) -> Result<Vec<Observation>, SourceError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        if self.unavailable.contains(series) {
            return Err(SourceError::new(series, "upstream unavailable"));
        }

        let observations = if series.contains('/') {
            self.counts(series, window)?
        } else {
            self.prices(series, window)?
        };
        tracing::trace!(series, rows = observations.len(), "Synthetic fetch");
        Ok(observations)
    }
}
