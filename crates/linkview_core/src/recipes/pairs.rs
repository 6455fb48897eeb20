use std::collections::BTreeMap;

use super::{DatasetRecipe, FetchedSeries, SeriesRequest, inner_join, relative_change};
use crate::error::{DashboardError, Result};
use crate::model::{
    Column, DateWindow, DerivedDataset, ParamValue, ParameterSet, Schema, TIME_COLUMN,
};

/// Correlation of daily returns between two distinct tickers.
///
/// Output columns: `date`, `t1`, `t2`, `t1_returns`, `t2_returns`, where
/// `t1` is always the series chosen for `ticker_a`.
#[derive(Debug, Clone)]
pub struct PairReturns {
    catalog: Vec<String>,
    window: DateWindow,
    initial: ParameterSet,
}

impl PairReturns {
    pub const TICKER_A: &'static str = "ticker_a";
    pub const TICKER_B: &'static str = "ticker_b";

    /// The first two catalog entries are the initial selection.
    pub fn new(catalog: Vec<String>, window: DateWindow) -> Result<Self> {
        let [a, b, ..] = catalog.as_slice() else {
            return Err(DashboardError::invalid(
                Self::TICKER_A,
                catalog.join(","),
                "a pair needs at least two tickers",
            ));
        };
        let initial = ParameterSet::new()
            .with(Self::TICKER_A, ParamValue::choice(a.as_str()))
            .with(Self::TICKER_B, ParamValue::choice(b.as_str()));
        Ok(Self {
            catalog,
            window,
            initial,
        })
    }

    pub fn with_initial(mut self, a: &str, b: &str) -> Result<Self> {
        let initial = ParameterSet::new()
            .with(Self::TICKER_A, ParamValue::choice(a))
            .with(Self::TICKER_B, ParamValue::choice(b));
        self.schema().validate(&initial)?;
        self.initial = initial;
        Ok(self)
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }
}

impl DatasetRecipe for PairReturns {
    fn name(&self) -> &'static str {
        "pair_returns"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .choices(Self::TICKER_A, self.catalog.iter().cloned())
            .choices(Self::TICKER_B, self.catalog.iter().cloned())
            .distinct(Self::TICKER_A, Self::TICKER_B)
    }

    fn initial_parameters(&self) -> ParameterSet {
        self.initial.clone()
    }

    fn requests(&self, params: &ParameterSet) -> Result<Vec<SeriesRequest>> {
        [Self::TICKER_A, Self::TICKER_B]
            .into_iter()
            .map(|dim| {
                Ok(SeriesRequest {
                    id: params.choice(dim)?.to_string(),
                    window: self.window,
                })
            })
            .collect()
    }

    fn derive(&self, params: &ParameterSet, fetched: Vec<FetchedSeries>) -> Result<DerivedDataset> {
        let [a, b] = fetched.as_slice() else {
            return Err(DashboardError::CacheCorruption(format!(
                "expected two series, got {}",
                fetched.len()
            )));
        };

        let joined = inner_join(&[a.observations.as_slice(), b.observations.as_slice()]);

        let mut dates = Vec::with_capacity(joined.len());
        let (mut t1, mut t2) = (Vec::new(), Vec::new());
        let (mut r1, mut r2) = (Vec::new(), Vec::new());

        // The first joined row has no predecessor and therefore no returns.
        for pair in joined.windows(2) {
            let (prev, (date, next)) = (&pair[0].1, &pair[1]);
            let (Some(ret1), Some(ret2)) = (
                relative_change(prev[0], next[0]),
                relative_change(prev[1], next[1]),
            ) else {
                continue;
            };
            dates.push(*date);
            t1.push(next[0]);
            t2.push(next[1]);
            r1.push(ret1);
            r2.push(ret2);
        }

        if dates.is_empty() {
            return Err(DashboardError::EmptyResult);
        }

        DerivedDataset::new(
            params.clone(),
            vec![
                Column::dates(TIME_COLUMN, dates),
                Column::numbers("t1", t1),
                Column::numbers("t2", t2),
                Column::numbers("t1_returns", r1),
                Column::numbers("t2_returns", r2),
            ],
        )
    }

    fn summary_columns(&self) -> Vec<String> {
        ["t1", "t2", "t1_returns", "t2_returns"]
            .map(String::from)
            .to_vec()
    }

    fn labels(&self, params: &ParameterSet) -> BTreeMap<String, String> {
        let a = params.choice(Self::TICKER_A).unwrap_or_default();
        let b = params.choice(Self::TICKER_B).unwrap_or_default();
        BTreeMap::from([
            (
                "correlation".to_string(),
                format!("{a} returns vs. {b} returns"),
            ),
            ("series_a".to_string(), a.to_string()),
            ("series_b".to_string(), b.to_string()),
        ])
    }
}
