//! Dashboard configuration, loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! ticker pair dashboard over 2018-2019.
//!
//! ```yaml
//! dashboard: regional
//! cache:
//!   capacity: 64
//! regional:
//!   initial:
//!     month_range: [3, 5]
//!     metric: Total_Deaths
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use jiff::civil::{Date, date};
use serde::{Deserialize, Serialize};

use linkview_core::model::{DateWindow, ParamValue, ParameterSet};
use linkview_core::{
    DEFAULT_CAPACITY, DashboardError, DatasetRecipe, PairReturns, RegionalMetric, RetryPolicy,
};

/// Error types for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Which dataset shape the dashboard explores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardKind {
    #[default]
    Pairs,
    Regional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            multiplier: policy.multiplier,
        }
    }
}

/// Settings for the synthetic upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub seed: u64,
    /// Simulated latency per fetch
    pub latency_ms: u64,
    /// Series ids whose fetches always fail
    pub unavailable: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            latency_ms: 0,
            unavailable: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairsConfig {
    pub tickers: Vec<String>,
    pub start: Date,
    pub end: Date,
    pub ticker_a: Option<String>,
    pub ticker_b: Option<String>,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            tickers: ["AAPL", "GOOG", "MSFT", "NFLX", "TSLA"]
                .map(String::from)
                .to_vec(),
            start: date(2018, 1, 1),
            end: date(2020, 1, 1),
            ticker_a: Some("AAPL".into()),
            ticker_b: Some("GOOG".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionalInitial {
    pub region: Option<String>,
    pub year: Option<String>,
    pub month_range: (i64, i64),
    pub metric: Option<String>,
}

impl Default for RegionalInitial {
    fn default() -> Self {
        Self {
            region: Some("DKI Jakarta".into()),
            year: Some("2020".into()),
            month_range: (3, 5),
            metric: Some("Total_Deaths".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionalConfig {
    pub regions: Vec<String>,
    pub years: Vec<String>,
    pub metrics: Vec<String>,
    pub start: Date,
    pub end: Date,
    pub initial: RegionalInitial,
}

impl Default for RegionalConfig {
    fn default() -> Self {
        Self {
            regions: [
                "DKI Jakarta",
                "Jawa Barat",
                "Jawa Tengah",
                "Jawa Timur",
                "Banten",
                "Bali",
            ]
            .map(String::from)
            .to_vec(),
            years: ["2020", "2021"].map(String::from).to_vec(),
            metrics: [
                "Total_Cases",
                "Total_Deaths",
                "Total_Recovered",
                "Total_Active_Cases",
            ]
            .map(String::from)
            .to_vec(),
            start: date(2020, 3, 1),
            end: date(2021, 12, 31),
            initial: RegionalInitial::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub dashboard: DashboardKind,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub source: SourceConfig,
    pub pairs: PairsConfig,
    pub regional: RegionalConfig,
}

impl DashboardConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_saphyr::to_string(self)
            .map_err(|e| ConfigError::Serialize(format!("Failed to serialize config: {}", e)))
    }

    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.display(), kind = ?config.dashboard, "Loaded config");
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry.attempts.max(1),
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            multiplier: self.retry.multiplier,
        }
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.source.latency_ms)
    }

    /// The recipe for the configured dashboard kind, with its initial
    /// parameters validated.
    pub fn recipe(&self) -> Result<Arc<dyn DatasetRecipe>, DashboardError> {
        match self.dashboard {
            DashboardKind::Pairs => {
                let pairs = &self.pairs;
                let mut recipe = PairReturns::new(
                    pairs.tickers.clone(),
                    DateWindow::new(pairs.start, pairs.end),
                )?;
                if let (Some(a), Some(b)) = (&pairs.ticker_a, &pairs.ticker_b) {
                    recipe = recipe.with_initial(a, b)?;
                }
                Ok(Arc::new(recipe))
            }
            DashboardKind::Regional => {
                let regional = &self.regional;
                let recipe = RegionalMetric::new(
                    regional.regions.clone(),
                    regional.metrics.clone(),
                    regional.years.clone(),
                    DateWindow::new(regional.start, regional.end),
                )?;

                let mut initial = recipe.initial_parameters();
                let choices = [
                    (RegionalMetric::REGION, &regional.initial.region),
                    (RegionalMetric::YEAR, &regional.initial.year),
                    (RegionalMetric::METRIC, &regional.initial.metric),
                ];
                for (dimension, value) in choices {
                    if let Some(value) = value {
                        initial.insert(dimension, ParamValue::choice(value.as_str()));
                    }
                }
                let (lo, hi) = regional.initial.month_range;
                initial.insert(RegionalMetric::MONTH_RANGE, ParamValue::Span(lo, hi));

                Ok(Arc::new(recipe.with_initial(initial)?))
            }
        }
    }

    /// Every series id the configured dashboard can request.
    pub fn series_ids(&self) -> Vec<String> {
        match self.dashboard {
            DashboardKind::Pairs => self.pairs.tickers.clone(),
            DashboardKind::Regional => self
                .regional
                .regions
                .iter()
                .flat_map(|r| self.regional.metrics.iter().map(move |m| format!("{r}/{m}")))
                .collect(),
        }
    }

    pub fn initial_parameters(&self) -> Result<ParameterSet, DashboardError> {
        Ok(self.recipe()?.initial_parameters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkview_core::ErrorKind;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = DashboardConfig::from_yaml("{}").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.cache.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = "dashboard: regional\ncache:\n  capacity: 8\nsource:\n  latency_ms: 5\n";
        let config = DashboardConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.dashboard, DashboardKind::Regional);
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.latency(), Duration::from_millis(5));
        assert_eq!(config.source.seed, 42);
        assert_eq!(config.regional.years, vec!["2020", "2021"]);
    }

    #[test]
    fn test_default_pairs_recipe() {
        let params = DashboardConfig::default().initial_parameters().unwrap();
        assert_eq!(params.choice(PairReturns::TICKER_A).unwrap(), "AAPL");
        assert_eq!(params.choice(PairReturns::TICKER_B).unwrap(), "GOOG");
    }

    #[test]
    fn test_default_regional_recipe() {
        let config = DashboardConfig {
            dashboard: DashboardKind::Regional,
            ..Default::default()
        };
        let params = config.initial_parameters().unwrap();
        assert_eq!(params.span(RegionalMetric::MONTH_RANGE).unwrap(), (3, 5));
        assert_eq!(params.choice(RegionalMetric::METRIC).unwrap(), "Total_Deaths");
        assert_eq!(params.choice(RegionalMetric::REGION).unwrap(), "DKI Jakarta");
    }

    #[test]
    fn test_identical_initial_tickers_rejected() {
        let mut config = DashboardConfig::default();
        config.pairs.ticker_b = Some("AAPL".into());
        let err = config.recipe().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_series_ids() {
        let mut config = DashboardConfig::default();
        assert_eq!(config.series_ids().len(), 5);

        config.dashboard = DashboardKind::Regional;
        let ids = config.series_ids();
        assert_eq!(ids.len(), 24);
        assert!(ids.contains(&"Bali/Total_Cases".to_string()));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = DashboardConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(DashboardConfig::from_yaml(&yaml).unwrap(), config);
    }
}
