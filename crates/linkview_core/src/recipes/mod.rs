//! Dataset shapes.
//!
//! A recipe turns a validated [`ParameterSet`] into the upstream series it
//! needs and, once those are fetched, into a [`DerivedDataset`] with
//! canonical column names that do not depend on which entities were chosen.

mod pairs;
mod regional;

use std::collections::BTreeMap;

use jiff::civil::Date;

use crate::error::Result;
use crate::model::{DateWindow, DerivedDataset, Observation, ParameterSet, Schema};

pub use pairs::PairReturns;
pub use regional::RegionalMetric;

/// One upstream fetch a build needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub id: String,
    pub window: DateWindow,
}

/// The result of a [`SeriesRequest`], in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSeries {
    pub id: String,
    pub observations: Vec<Observation>,
}

pub trait DatasetRecipe: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn initial_parameters(&self) -> ParameterSet;

    fn requests(&self, params: &ParameterSet) -> Result<Vec<SeriesRequest>>;

    /// Build the dataset from the fetched series. Fails with `EmptyResult`
    /// when no row survives the join or filter.
    fn derive(&self, params: &ParameterSet, fetched: Vec<FetchedSeries>) -> Result<DerivedDataset>;

    /// Columns the statistics panel describes.
    fn summary_columns(&self) -> Vec<String>;

    /// View titles and axis labels for the given parameters.
    fn labels(&self, params: &ParameterSet) -> BTreeMap<String, String>;
}

/// Inner-join several series on date. Dates missing from any series, or
/// carrying a non-finite value, are dropped rather than filled.
pub fn inner_join(series: &[&[Observation]]) -> Vec<(Date, Vec<f64>)> {
    let Some((first, rest)) = series.split_first() else {
        return Vec::new();
    };

    let finite = |obs: &[Observation]| -> BTreeMap<Date, f64> {
        obs.iter()
            .filter(|o| o.value.is_finite())
            .map(|o| (o.date, o.value))
            .collect()
    };
    let lookups: Vec<BTreeMap<Date, f64>> = rest.iter().map(|s| finite(s)).collect();

    finite(first)
        .into_iter()
        .filter_map(|(date, value)| {
            let mut row = Vec::with_capacity(series.len());
            row.push(value);
            for lookup in &lookups {
                row.push(*lookup.get(&date)?);
            }
            Some((date, row))
        })
        .collect()
}

/// Relative change from `prev` to `next`; `None` when undefined.
pub fn relative_change(prev: f64, next: f64) -> Option<f64> {
    let change = next / prev - 1.0;
    change.is_finite().then_some(change)
}
