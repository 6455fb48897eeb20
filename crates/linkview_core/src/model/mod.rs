//! Type definitions shared across the caching core.

mod dataset;
mod params;

pub use dataset::{Column, DateWindow, DerivedDataset, Observation, TIME_COLUMN, Value};
pub use params::{Constraint, Dimension, Domain, ParamValue, ParameterSet, Schema};
