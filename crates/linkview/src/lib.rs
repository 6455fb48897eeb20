//! Linked-view dashboard runtime
//!
//! This crate drives the caching core from `linkview_core`:
//! - A background build worker fed over channels
//! - The view binding that keeps the `live` and `static` sources in sync
//! - The dashboard session processing control events on one thread
//! - YAML configuration, file logging and a synthetic upstream source

// ============================================================================
// Core modules
// ============================================================================

pub mod binding;
pub mod session;
pub mod worker;

// ============================================================================
// Support modules
// ============================================================================

pub mod command;
pub mod config;
pub mod format;
pub mod logging;
pub mod synthetic;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use binding::{BindingState, ErrorSignal, ViewBinding, ViewSink, ViewSource, ViewSources};
pub use command::{Command, CommandError};
pub use config::{ConfigError, DashboardConfig, DashboardKind};
pub use logging::init_logging;
pub use session::{ControlEvent, Dashboard, Payloads, Snapshot};
pub use synthetic::SyntheticSource;
pub use worker::{BuildRequest, BuildResponse, BuildWorker, ThreadWorker};
