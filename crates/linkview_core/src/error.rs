use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification of a [`DashboardError`], used by the UI layer to
/// decide how an error is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    DataUnavailable,
    EmptyResult,
    CacheCorruption,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::DataUnavailable => "data unavailable",
            ErrorKind::EmptyResult => "empty result",
            ErrorKind::CacheCorruption => "cache corruption",
        };
        f.write_str(label)
    }
}

/// Errors raised by parameter validation, dataset builds and the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardError {
    /// The dimension is not declared in the schema
    UnknownDimension(String),
    /// The value lies outside the dimension's effective domain
    InvalidValue {
        dimension: String,
        value: String,
        reason: String,
    },
    /// A requested summary column does not exist in the dataset
    UnknownColumn(String),
    /// An upstream fetch failed after all retries
    DataUnavailable { series: String, reason: String },
    /// The join or filter produced zero usable rows
    EmptyResult,
    /// A cached entry failed its integrity check
    CacheCorruption(String),
}

impl DashboardError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::UnknownDimension(_)
            | DashboardError::InvalidValue { .. }
            | DashboardError::UnknownColumn(_) => ErrorKind::InvalidParameter,
            DashboardError::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            DashboardError::EmptyResult => ErrorKind::EmptyResult,
            DashboardError::CacheCorruption(_) => ErrorKind::CacheCorruption,
        }
    }

    pub(crate) fn invalid(
        dimension: &str,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        DashboardError::InvalidValue {
            dimension: dimension.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::UnknownDimension(name) => write!(f, "unknown dimension '{name}'"),
            DashboardError::InvalidValue {
                dimension,
                value,
                reason,
            } => write!(f, "invalid value '{value}' for '{dimension}': {reason}"),
            DashboardError::UnknownColumn(name) => write!(f, "unknown column '{name}'"),
            DashboardError::DataUnavailable { series, reason } => {
                write!(f, "data unavailable for series '{series}': {reason}")
            }
            DashboardError::EmptyResult => write!(f, "no data for this combination"),
            DashboardError::CacheCorruption(msg) => write!(f, "cache corruption: {msg}"),
        }
    }
}

impl std::error::Error for DashboardError {}

/// Failure reported by an upstream source for a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub series: String,
    pub reason: String,
}

impl SourceError {
    pub fn new(series: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch of '{}' failed: {}", self.series, self.reason)
    }
}

impl std::error::Error for SourceError {}

impl From<SourceError> for DashboardError {
    fn from(err: SourceError) -> Self {
        DashboardError::DataUnavailable {
            series: err.series,
            reason: err.reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
