//! The single owned holder of the currently selected control values.

use crate::error::{DashboardError, Result};
use crate::model::{Domain, ParamValue, ParameterSet, Schema};

type ParameterListener = Box<dyn FnMut(&ParameterSet)>;

/// Holds the current [`ParameterSet`] and validates every mutation against
/// the declared [`Schema`].
pub struct ParameterStore {
    schema: Schema,
    current: ParameterSet,
    listeners: Vec<ParameterListener>,
}

impl ParameterStore {
    pub fn new(schema: Schema, initial: ParameterSet) -> Result<Self> {
        schema.validate(&initial)?;
        Ok(Self {
            schema,
            current: initial,
            listeners: Vec::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn current(&self) -> &ParameterSet {
        &self.current
    }

    /// Options currently selectable for `dimension`. For a dimension under a
    /// `Distinct` constraint this excludes the value the other side holds.
    pub fn options(&self, dimension: &str) -> Result<Domain> {
        self.schema.effective_domain(dimension, &self.current)
    }

    /// Register a listener called once after every successful change.
    pub fn on_parameter_changed(&mut self, listener: impl FnMut(&ParameterSet) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Set `dimension` to `value`, returning the new full parameter set.
    ///
    /// On failure the stored set is unchanged. Re-selecting the current value
    /// succeeds without notifying listeners.
    pub fn set(&mut self, dimension: &str, value: ParamValue) -> Result<ParameterSet> {
        let domain = self.options(dimension)?;
        if !domain.contains(&value) {
            return Err(DashboardError::invalid(
                dimension,
                &value,
                "outside the allowed domain",
            ));
        }

        if self.current.get(dimension) == Some(&value) {
            return Ok(self.current.clone());
        }

        let mut next = self.current.clone();
        next.insert(dimension, value);
        self.schema.validate(&next)?;
        self.current = next;

        tracing::debug!(dimension, params = %self.current, "Parameter changed");
        for listener in &mut self.listeners {
            listener(&self.current);
        }
        Ok(self.current.clone())
    }

    /// Parse `text` through the dimension's domain, then [`set`](Self::set).
    pub fn set_text(&mut self, dimension: &str, text: &str) -> Result<ParameterSet> {
        let value = self
            .schema
            .dimension(dimension)
            .ok_or_else(|| DashboardError::UnknownDimension(dimension.to_string()))?
            .domain
            .parse(dimension, text)?;
        self.set(dimension, value)
    }
}
