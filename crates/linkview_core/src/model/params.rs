//! Parameter dimensions, their domains, and the parameter set used as the
//! dataset cache key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// A single control value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// One entry of an enumerated domain
    Choice(String),
    /// An inclusive `(lo, hi)` sub-range of a numeric domain
    Span(i64, i64),
}

impl ParamValue {
    pub fn choice(value: impl Into<String>) -> Self {
        ParamValue::Choice(value.into())
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            ParamValue::Choice(s) => Some(s),
            ParamValue::Span(..) => None,
        }
    }

    pub fn as_span(&self) -> Option<(i64, i64)> {
        match self {
            ParamValue::Span(lo, hi) => Some((*lo, *hi)),
            ParamValue::Choice(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Choice(s) => f.write_str(s),
            ParamValue::Span(lo, hi) => write!(f, "{lo}..{hi}"),
        }
    }
}

/// The set of values a dimension may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Choices(Vec<String>),
    /// Values are `Span(lo, hi)` with `min <= lo <= hi <= max`
    Span { min: i64, max: i64 },
}

impl Domain {
    pub fn contains(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (Domain::Choices(options), ParamValue::Choice(v)) => options.iter().any(|o| o == v),
            (Domain::Span { min, max }, ParamValue::Span(lo, hi)) => {
                min <= lo && lo <= hi && hi <= max
            }
            _ => false,
        }
    }

    /// Parse a textual control value. Spans accept `3..5`, `3-5` or `3,5`;
    /// a single number `n` is the span `n..n`.
    pub fn parse(&self, dimension: &str, text: &str) -> Result<ParamValue> {
        let text = text.trim();
        match self {
            Domain::Choices(_) => Ok(ParamValue::Choice(text.to_string())),
            Domain::Span { .. } => {
                let (lo, hi) = split_span(text)
                    .ok_or_else(|| DashboardError::invalid(dimension, text, "expected lo..hi"))?;
                let parse = |s: &str| {
                    s.trim()
                        .parse::<i64>()
                        .map_err(|e| DashboardError::invalid(dimension, text, e.to_string()))
                };
                Ok(ParamValue::Span(parse(lo)?, parse(hi)?))
            }
        }
    }
}

fn split_span(text: &str) -> Option<(&str, &str)> {
    for sep in ["..", "-", ","] {
        if let Some(pair) = text.split_once(sep) {
            return Some(pair);
        }
    }
    if text.is_empty() {
        None
    } else {
        Some((text, text))
    }
}

/// A named control dimension, declared once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub domain: Domain,
}

/// Rule spanning more than one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// The two dimensions never hold the same choice
    Distinct(String, String),
}

impl Constraint {
    /// Dimensions whose current value is excluded from `dimension`'s options.
    fn excluding<'a>(&'a self, dimension: &str) -> Option<&'a str> {
        match self {
            Constraint::Distinct(a, b) if a == dimension => Some(b.as_str()),
            Constraint::Distinct(a, b) if b == dimension => Some(a.as_str()),
            Constraint::Distinct(..) => None,
        }
    }
}

/// Declared dimensions and constraints of one dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    dimensions: Vec<Dimension>,
    constraints: Vec<Constraint>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn choices<I, S>(mut self, name: &str, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions.push(Dimension {
            name: name.to_string(),
            domain: Domain::Choices(options.into_iter().map(Into::into).collect()),
        });
        self
    }

    #[must_use]
    pub fn span(mut self, name: &str, min: i64, max: i64) -> Self {
        self.dimensions.push(Dimension {
            name: name.to_string(),
            domain: Domain::Span { min, max },
        });
        self
    }

    #[must_use]
    pub fn distinct(mut self, a: &str, b: &str) -> Self {
        self.constraints
            .push(Constraint::Distinct(a.to_string(), b.to_string()));
        self
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// The declared domain of `name` narrowed by the constraints against
    /// the values currently held in `current`.
    pub fn effective_domain(&self, name: &str, current: &ParameterSet) -> Result<Domain> {
        let dimension = self
            .dimension(name)
            .ok_or_else(|| DashboardError::UnknownDimension(name.to_string()))?;

        let Domain::Choices(options) = &dimension.domain else {
            return Ok(dimension.domain.clone());
        };

        let excluded: Vec<&ParamValue> = self
            .constraints
            .iter()
            .filter_map(|c| c.excluding(name))
            .filter_map(|other| current.get(other))
            .collect();

        Ok(Domain::Choices(
            options
                .iter()
                .filter(|o| !excluded.iter().any(|v| v.as_choice() == Some(o.as_str())))
                .cloned()
                .collect(),
        ))
    }

    /// Check that `params` assigns every declared dimension (and nothing
    /// else) a value inside its effective domain.
    pub fn validate(&self, params: &ParameterSet) -> Result<()> {
        for (name, _) in params.iter() {
            if self.dimension(name).is_none() {
                return Err(DashboardError::UnknownDimension(name.to_string()));
            }
        }
        for dimension in &self.dimensions {
            let value = params.get(&dimension.name).ok_or_else(|| {
                DashboardError::invalid(&dimension.name, "<missing>", "no value assigned")
            })?;
            let domain = self.effective_domain(&dimension.name, params)?;
            if !domain.contains(value) {
                return Err(DashboardError::invalid(
                    &dimension.name,
                    value,
                    "outside the allowed domain",
                ));
            }
        }
        Ok(())
    }
}

/// Ordered mapping of dimension name to value. Equality of two sets is
/// the dataset cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) -> Option<ParamValue> {
        self.0.insert(name.to_string(), value)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The choice held by `name`, or `InvalidParameter` if absent or a span.
    pub fn choice(&self, name: &str) -> Result<&str> {
        self.get(name)
            .and_then(ParamValue::as_choice)
            .ok_or_else(|| DashboardError::invalid(name, "<missing>", "expected a choice"))
    }

    /// The span held by `name`, or `InvalidParameter` if absent or a choice.
    pub fn span(&self, name: &str) -> Result<(i64, i64)> {
        self.get(name)
            .and_then(ParamValue::as_span)
            .ok_or_else(|| DashboardError::invalid(name, "<missing>", "expected a range"))
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_schema() -> Schema {
        Schema::new()
            .choices("ticker_a", ["AAPL", "GOOG", "MSFT"])
            .choices("ticker_b", ["AAPL", "GOOG", "MSFT"])
            .distinct("ticker_a", "ticker_b")
    }

    #[test]
    fn test_span_parsing() {
        let domain = Domain::Span { min: 1, max: 12 };
        assert_eq!(domain.parse("m", "3..5").unwrap(), ParamValue::Span(3, 5));
        assert_eq!(domain.parse("m", "3-5").unwrap(), ParamValue::Span(3, 5));
        assert_eq!(domain.parse("m", " 4 ").unwrap(), ParamValue::Span(4, 4));
        assert!(domain.parse("m", "x..5").is_err());
        assert!(domain.contains(&ParamValue::Span(3, 3)));
        assert!(!domain.contains(&ParamValue::Span(5, 3)));
        assert!(!domain.contains(&ParamValue::Span(0, 3)));
    }

    #[test]
    fn test_effective_domain_excludes_distinct_value() {
        let schema = pair_schema();
        let params = ParameterSet::new()
            .with("ticker_a", ParamValue::choice("AAPL"))
            .with("ticker_b", ParamValue::choice("GOOG"));

        let b_options = schema.effective_domain("ticker_b", &params).unwrap();
        assert_eq!(
            b_options,
            Domain::Choices(vec!["GOOG".to_string(), "MSFT".to_string()])
        );
        assert!(schema.validate(&params).is_ok());
    }

    #[test]
    fn test_validate_rejects_equal_pair() {
        let schema = pair_schema();
        let params = ParameterSet::new()
            .with("ticker_a", ParamValue::choice("AAPL"))
            .with("ticker_b", ParamValue::choice("AAPL"));
        let err = schema.validate(&params).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_parameter_set_display_is_ordered() {
        let params = ParameterSet::new()
            .with("year", ParamValue::choice("2020"))
            .with("month_range", ParamValue::Span(3, 5));
        assert_eq!(params.to_string(), "month_range=3..5, year=2020");
    }
}
