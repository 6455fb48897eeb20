//! Descriptive statistics over the selected rows of a dataset.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::model::{DerivedDataset, Value};

/// Count, mean, sample standard deviation, min, quartiles and max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; NaN for a single value
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnStats {
    /// `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let n = count as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std = if count > 1 {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            f64::NAN
        };

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            q50: quantile(&sorted, 0.50),
            q75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSummary {
    Stats(ColumnStats),
    /// No numeric value in the effective row set
    Empty,
}

/// Statistics for each requested column over the effective row set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    /// Size of the effective row set
    pub rows: usize,
    pub columns: Vec<(String, ColumnSummary)>,
}

impl SummaryResult {
    /// The explicit marker for an empty row set.
    pub fn empty(columns: &[String]) -> Self {
        Self {
            rows: 0,
            columns: columns
                .iter()
                .map(|c| (c.clone(), ColumnSummary::Empty))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns
            .iter()
            .find(|(c, _)| c == name)
            .map(|(_, summary)| summary)
    }
}

pub struct SummaryComputer;

impl SummaryComputer {
    /// Describe `columns` over the rows in `selection`, or over every row
    /// when `selection` is empty. Out-of-range indices are ignored.
    pub fn compute(
        dataset: &DerivedDataset,
        selection: &[usize],
        columns: &[String],
    ) -> Result<SummaryResult> {
        let rows: Vec<usize> = if selection.is_empty() {
            (0..dataset.len()).collect()
        } else {
            selection
                .iter()
                .copied()
                .filter(|&i| i < dataset.len())
                .collect()
        };

        let data = columns
            .iter()
            .map(|name| {
                dataset
                    .column(name)
                    .map(|values| (name, values))
                    .ok_or_else(|| DashboardError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        if rows.is_empty() {
            return Ok(SummaryResult::empty(columns));
        }

        let describe = |(name, values): &(&String, &[Value])| {
            let numbers: Vec<f64> = rows.iter().filter_map(|&i| values[i].as_f64()).collect();
            let summary = ColumnStats::from_values(&numbers)
                .map_or(ColumnSummary::Empty, ColumnSummary::Stats);
            (name.to_string(), summary)
        };

        #[cfg(feature = "parallel")]
        let summaries = data.par_iter().map(describe).collect();
        #[cfg(not(feature = "parallel"))]
        let summaries = data.iter().map(describe).collect();

        Ok(SummaryResult {
            rows: rows.len(),
            columns: summaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ParameterSet, TIME_COLUMN};
    use jiff::civil::date;

    fn dataset() -> DerivedDataset {
        DerivedDataset::new(
            ParameterSet::new(),
            vec![
                Column::dates(TIME_COLUMN, (1..=5).map(|d| date(2020, 1, d))),
                Column::numbers("v", [1.0, 2.0, 3.0, 4.0, 10.0]),
            ],
        )
        .unwrap()
    }

    fn stats(result: &SummaryResult, name: &str) -> ColumnStats {
        match result.column(name) {
            Some(ColumnSummary::Stats(s)) => *s,
            other => panic!("expected stats, got {other:?}"),
        }
    }

    #[test]
    fn test_full_dataset_stats() {
        let result = SummaryComputer::compute(&dataset(), &[], &["v".to_string()]).unwrap();
        let s = stats(&result, "v");

        assert_eq!(result.rows, 5);
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 4.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.q25, 2.0);
        assert_eq!(s.q50, 3.0);
        assert_eq!(s.q75, 4.0);
        assert_eq!(s.max, 10.0);
        // variance = (9 + 4 + 1 + 0 + 36) / 4
        assert!((s.std - 12.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_selection_scopes_rows() {
        let result = SummaryComputer::compute(&dataset(), &[0, 1, 99], &["v".to_string()]).unwrap();
        let s = stats(&result, "v");
        assert_eq!(result.rows, 2);
        assert_eq!(s.mean, 1.5);
        assert_eq!(s.q50, 1.5);
    }

    #[test]
    fn test_single_row_has_undefined_std() {
        let result = SummaryComputer::compute(&dataset(), &[2], &["v".to_string()]).unwrap();
        assert!(stats(&result, "v").std.is_nan());
    }

    #[test]
    fn test_empty_row_set_is_marker() {
        let result = SummaryComputer::compute(&dataset(), &[42], &["v".to_string()]).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.column("v"), Some(&ColumnSummary::Empty));
    }

    #[test]
    fn test_unknown_column() {
        let err = SummaryComputer::compute(&dataset(), &[], &["nope".to_string()]).unwrap_err();
        assert_eq!(err, DashboardError::UnknownColumn("nope".to_string()));
    }

    #[test]
    fn test_non_numeric_column_is_empty() {
        let result =
            SummaryComputer::compute(&dataset(), &[], &[TIME_COLUMN.to_string()]).unwrap();
        assert_eq!(result.column(TIME_COLUMN), Some(&ColumnSummary::Empty));
    }
}
