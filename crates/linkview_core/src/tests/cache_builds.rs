//! The cache driving real builds.

use std::sync::Arc;

use super::fixtures::{aligned_pair_source, pair_recipe};
use crate::builder::{DatasetBuilder, RetryPolicy};
use crate::cache::{CacheLookup, DatasetCache};
use crate::error::ErrorKind;
use crate::model::{ParamValue, ParameterSet};
use crate::recipes::{DatasetRecipe, PairReturns};

fn pair(a: &str, b: &str) -> ParameterSet {
    ParameterSet::new()
        .with(PairReturns::TICKER_A, ParamValue::choice(a))
        .with(PairReturns::TICKER_B, ParamValue::choice(b))
}

fn builder() -> DatasetBuilder {
    DatasetBuilder::new(Arc::new(aligned_pair_source()), Arc::new(pair_recipe()))
        .with_retry(RetryPolicy::none())
}

#[test]
fn test_repeated_keys_invoke_builder_once() {
    let builder = builder();
    let mut cache = DatasetCache::new(8);
    let key = pair("AAPL", "GOOG");

    let first = cache.get_or_build(&key, |p| builder.build(p)).unwrap();
    for _ in 0..10 {
        let again = cache.get_or_build(&key, |p| builder.build(p)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
    assert_eq!(builder.build_count(), 1);
}

#[test]
fn test_returning_to_previous_key_is_a_hit() {
    let builder = builder();
    let mut cache = DatasetCache::new(8);

    cache
        .get_or_build(&pair("AAPL", "GOOG"), |p| builder.build(p))
        .unwrap();
    cache
        .get_or_build(&pair("AAPL", "MSFT"), |p| builder.build(p))
        .unwrap();
    cache
        .get_or_build(&pair("AAPL", "GOOG"), |p| builder.build(p))
        .unwrap();

    assert_eq!(builder.build_count(), 2);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_dispatched_build_completes_for_all_waiters() {
    let builder = builder();
    let mut cache = DatasetCache::new(8);
    let key = pair("NFLX", "TSLA");

    assert!(matches!(cache.begin(&key), CacheLookup::Dispatch));
    for _ in 0..3 {
        assert!(matches!(cache.begin(&key), CacheLookup::Pending));
    }

    let dataset = cache.complete(&key, builder.build(&key)).unwrap();
    assert_eq!(dataset.parameters(), &key);
    assert_eq!(builder.build_count(), 1);
    assert_eq!(cache.stats().deduplicated, 3);
}

#[test]
fn test_failed_build_retries_on_next_request() {
    let source = Arc::new(aligned_pair_source());
    source.fail_series("GOOG");
    let builder = DatasetBuilder::new(source.clone(), Arc::new(pair_recipe()))
        .with_retry(RetryPolicy::none());
    let mut cache = DatasetCache::new(8);
    let key = builder.recipe().initial_parameters();

    let err = cache.get_or_build(&key, |p| builder.build(p)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    assert!(!cache.contains(&key));

    source.recover_series("GOOG");
    let dataset = cache.get_or_build(&key, |p| builder.build(p)).unwrap();
    assert_eq!(dataset.len(), 499);
    assert_eq!(builder.build_count(), 2);
}

#[test]
fn test_bounded_cache_rebuilds_evicted_key() {
    let builder = builder();
    let mut cache = DatasetCache::new(2);

    for key in [pair("AAPL", "GOOG"), pair("AAPL", "MSFT"), pair("AAPL", "NFLX")] {
        cache.get_or_build(&key, |p| builder.build(p)).unwrap();
    }
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&pair("AAPL", "GOOG")));

    cache
        .get_or_build(&pair("AAPL", "GOOG"), |p| builder.build(p))
        .unwrap();
    assert_eq!(builder.build_count(), 4);
}
