//! Upstream observations and the immutable derived dataset.

use std::collections::BTreeMap;

use jiff::civil::Date;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::ParameterSet;
use crate::error::{DashboardError, Result};

/// Name of the time column every dataset is sorted by.
pub const TIME_COLUMN: &str = "date";

/// One `(time, value)` pair supplied by an upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: Date,
    pub value: f64,
}

impl Observation {
    pub fn new(date: Date, value: f64) -> Self {
        Self { date, value }
    }
}

/// Inclusive date window an upstream fetch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Date,
    pub end: Date,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A single cell of a derived dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Date(Date),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A named, row-aligned column of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn numbers(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Value::Number).collect())
    }

    pub fn dates(name: impl Into<String>, values: impl IntoIterator<Item = Date>) -> Self {
        Self::new(name, values.into_iter().map(Value::Date).collect())
    }
}

/// The fully computed table produced for one [`ParameterSet`].
///
/// Columns all have the same length, rows are sorted ascending by
/// [`TIME_COLUMN`] and no cell is missing. A dataset is never modified after
/// construction; consumers share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedDataset {
    parameters: ParameterSet,
    columns: Vec<Column>,
    #[serde(skip)]
    index: FxHashMap<String, usize>,
    rows: usize,
}

impl DerivedDataset {
    pub fn new(parameters: ParameterSet, columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map_or(0, |c| c.values.len());
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        let dataset = Self {
            parameters,
            columns,
            index,
            rows,
        };
        dataset
            .check_invariants()
            .map_err(DashboardError::CacheCorruption)?;
        Ok(dataset)
    }

    /// Verify the shape invariants; the error names the first violation.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.index.len() != self.columns.len() {
            return Err("duplicate column names".to_string());
        }
        for column in &self.columns {
            if column.values.len() != self.rows {
                return Err(format!(
                    "column '{}' has {} values, expected {}",
                    column.name,
                    column.values.len(),
                    self.rows
                ));
            }
            if column
                .values
                .iter()
                .any(|v| matches!(v, Value::Number(n) if !n.is_finite()))
            {
                return Err(format!("column '{}' has a missing value", column.name));
            }
        }
        if let Some(time) = self.column(TIME_COLUMN) {
            let sorted = time
                .windows(2)
                .all(|w| match (w[0].as_date(), w[1].as_date()) {
                    (Some(a), Some(b)) => a <= b,
                    _ => false,
                });
            if !sorted {
                return Err("rows are not sorted by date".to_string());
            }
        } else if !self.columns.is_empty() {
            return Err(format!("missing '{TIME_COLUMN}' column"));
        }
        Ok(())
    }

    /// The parameter set this dataset was built from.
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.index
            .get(name)
            .map(|&i| self.columns[i].values.as_slice())
    }

    /// One row as a column name → value mapping.
    pub fn row(&self, index: usize) -> Option<BTreeMap<&str, &Value>> {
        if index >= self.rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.as_str(), &c.values[index]))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    #[test]
    fn test_dataset_rejects_ragged_columns() {
        let err = DerivedDataset::new(
            ParameterSet::new(),
            vec![
                Column::dates(TIME_COLUMN, [date(2020, 1, 1), date(2020, 1, 2)]),
                Column::numbers("v", [1.0]),
            ],
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CacheCorruption);
    }

    #[test]
    fn test_dataset_rejects_unsorted_dates() {
        let result = DerivedDataset::new(
            ParameterSet::new(),
            vec![
                Column::dates(TIME_COLUMN, [date(2020, 1, 2), date(2020, 1, 1)]),
                Column::numbers("v", [1.0, 2.0]),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_row_access() {
        let ds = DerivedDataset::new(
            ParameterSet::new(),
            vec![
                Column::dates(TIME_COLUMN, [date(2020, 1, 1), date(2020, 1, 2)]),
                Column::numbers("v", [1.0, 2.0]),
            ],
        )
        .unwrap();
        let row = ds.row(1).unwrap();
        assert_eq!(row["v"], &Value::Number(2.0));
        assert!(ds.row(2).is_none());
        assert_eq!(ds.column_names().collect::<Vec<_>>(), vec!["date", "v"]);
    }
}
