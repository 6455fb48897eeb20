//! Parameter-keyed dataset caching for linked exploration dashboards
//!
//! This crate holds the pure, single-threaded part of the system:
//! - Parameter dimensions, cross-dimension constraints and the parameter store
//! - Dataset recipes (ticker pair returns, regional metrics) and the builder
//! - An LRU dataset cache that deduplicates in-flight builds
//! - Selection tracking and descriptive statistics over a selection
//!
//! Threads, view payloads and configuration live in the `linkview` crate.
//!
//! ```ignore
//! use linkview_core::{DatasetBuilder, DatasetCache, PairReturns};
//!
//! let recipe = Arc::new(PairReturns::new(tickers, window)?);
//! let builder = DatasetBuilder::new(source, recipe.clone());
//! let mut cache = DatasetCache::default();
//! let dataset = cache.get_or_build(&recipe.initial_parameters(), |p| builder.build(p))?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod builder;
pub mod cache;
pub mod error;
pub mod recipes;
pub mod selection;
pub mod source;
pub mod store;
pub mod summary;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use builder::{DatasetBuilder, RetryPolicy};
pub use cache::{CacheLookup, CacheStats, DEFAULT_CAPACITY, DatasetCache};
pub use error::{DashboardError, ErrorKind, SourceError};
pub use recipes::{DatasetRecipe, PairReturns, RegionalMetric};
pub use selection::SelectionTracker;
pub use source::{MemorySource, UpstreamSource};
pub use store::ParameterStore;
pub use summary::{ColumnStats, ColumnSummary, SummaryComputer, SummaryResult};
