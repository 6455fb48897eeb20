use std::collections::BTreeMap;

use super::{DatasetRecipe, FetchedSeries, SeriesRequest};
use crate::error::{DashboardError, Result};
use crate::model::{
    Column, DateWindow, DerivedDataset, ParamValue, ParameterSet, Schema, TIME_COLUMN, Value,
};

/// One metric for one region, filtered to a year and a month range.
///
/// Output columns: `date`, `value`, `month`, `year`. The upstream series
/// identifier is `"<region>/<metric>"`.
#[derive(Debug, Clone)]
pub struct RegionalMetric {
    regions: Vec<String>,
    metrics: Vec<String>,
    years: Vec<String>,
    window: DateWindow,
    initial: ParameterSet,
}

impl RegionalMetric {
    pub const REGION: &'static str = "region";
    pub const YEAR: &'static str = "year";
    pub const MONTH_RANGE: &'static str = "month_range";
    pub const METRIC: &'static str = "metric";

    pub fn new(
        regions: Vec<String>,
        metrics: Vec<String>,
        years: Vec<String>,
        window: DateWindow,
    ) -> Result<Self> {
        let first = |dim: &str, options: &[String]| {
            options
                .first()
                .map(|v| ParamValue::choice(v.as_str()))
                .ok_or_else(|| DashboardError::invalid(dim, "<none>", "no options declared"))
        };
        let initial = ParameterSet::new()
            .with(Self::REGION, first(Self::REGION, &regions)?)
            .with(Self::YEAR, first(Self::YEAR, &years)?)
            .with(Self::MONTH_RANGE, ParamValue::Span(1, 12))
            .with(Self::METRIC, first(Self::METRIC, &metrics)?);
        Ok(Self {
            regions,
            metrics,
            years,
            window,
            initial,
        })
    }

    pub fn with_initial(mut self, initial: ParameterSet) -> Result<Self> {
        self.schema().validate(&initial)?;
        self.initial = initial;
        Ok(self)
    }

    fn series_id(params: &ParameterSet) -> Result<String> {
        Ok(format!(
            "{}/{}",
            params.choice(Self::REGION)?,
            params.choice(Self::METRIC)?
        ))
    }
}

impl DatasetRecipe for RegionalMetric {
    fn name(&self) -> &'static str {
        "regional_metric"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .choices(Self::REGION, self.regions.iter().cloned())
            .choices(Self::YEAR, self.years.iter().cloned())
            .span(Self::MONTH_RANGE, 1, 12)
            .choices(Self::METRIC, self.metrics.iter().cloned())
    }

    fn initial_parameters(&self) -> ParameterSet {
        self.initial.clone()
    }

    fn requests(&self, params: &ParameterSet) -> Result<Vec<SeriesRequest>> {
        Ok(vec![SeriesRequest {
            id: Self::series_id(params)?,
            window: self.window,
        }])
    }

    fn derive(&self, params: &ParameterSet, fetched: Vec<FetchedSeries>) -> Result<DerivedDataset> {
        let year = params.choice(Self::YEAR)?;
        let (first_month, last_month) = params.span(Self::MONTH_RANGE)?;
        let months = first_month..=last_month;

        let mut rows: Vec<_> = fetched
            .into_iter()
            .flat_map(|series| series.observations)
            .filter(|o| o.value.is_finite())
            .filter(|o| o.date.year().to_string() == year)
            .filter(|o| months.contains(&i64::from(o.date.month())))
            .collect();
        rows.sort_by_key(|o| o.date);

        if rows.is_empty() {
            return Err(DashboardError::EmptyResult);
        }

        DerivedDataset::new(
            params.clone(),
            vec![
                Column::dates(TIME_COLUMN, rows.iter().map(|o| o.date)),
                Column::numbers("value", rows.iter().map(|o| o.value)),
                Column::numbers("month", rows.iter().map(|o| f64::from(o.date.month()))),
                Column::new(
                    "year",
                    rows.iter().map(|_| Value::Text(year.to_string())).collect(),
                ),
            ],
        )
    }

    fn summary_columns(&self) -> Vec<String> {
        vec!["value".to_string()]
    }

    fn labels(&self, params: &ParameterSet) -> BTreeMap<String, String> {
        let region = params.choice(Self::REGION).unwrap_or_default();
        let metric = params.choice(Self::METRIC).unwrap_or_default();
        BTreeMap::from([
            ("title".to_string(), format!("{metric} in {region}")),
            ("x_axis".to_string(), "Date".to_string()),
            ("y_axis".to_string(), metric.to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Observation;
    use jiff::civil::date;

    fn recipe() -> RegionalMetric {
        RegionalMetric::new(
            vec!["DKI Jakarta".into(), "Bali".into()],
            vec!["Total_Cases".into(), "Total_Deaths".into()],
            vec!["2020".into(), "2021".into()],
            DateWindow::new(date(2020, 1, 1), date(2021, 12, 31)),
        )
        .unwrap()
    }

    fn params(months: (i64, i64)) -> ParameterSet {
        ParameterSet::new()
            .with(RegionalMetric::REGION, ParamValue::choice("DKI Jakarta"))
            .with(RegionalMetric::YEAR, ParamValue::choice("2020"))
            .with(RegionalMetric::MONTH_RANGE, ParamValue::Span(months.0, months.1))
            .with(RegionalMetric::METRIC, ParamValue::choice("Total_Deaths"))
    }

    #[test]
    fn test_series_id() {
        let requests = recipe().requests(&params((3, 5))).unwrap();
        assert_eq!(requests[0].id, "DKI Jakarta/Total_Deaths");
    }

    #[test]
    fn test_derive_filters_year_and_months() {
        let observations = vec![
            Observation::new(date(2020, 2, 28), 1.0),
            Observation::new(date(2020, 3, 1), 2.0),
            Observation::new(date(2020, 5, 31), 3.0),
            Observation::new(date(2020, 6, 1), 4.0),
            Observation::new(date(2021, 4, 1), 5.0),
        ];
        let fetched = vec![FetchedSeries {
            id: "DKI Jakarta/Total_Deaths".into(),
            observations,
        }];

        let ds = recipe().derive(&params((3, 5)), fetched).unwrap();
        let values: Vec<f64> = ds
            .column("value")
            .unwrap()
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        assert_eq!(values, vec![2.0, 3.0]);
        assert!(
            ds.column("year")
                .unwrap()
                .iter()
                .all(|v| v.as_text() == Some("2020"))
        );
    }

    #[test]
    fn test_labels_follow_metric() {
        let labels = recipe().labels(&params((3, 5)));
        assert_eq!(labels["y_axis"], "Total_Deaths");
    }
}
