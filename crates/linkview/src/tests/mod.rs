//! Integration tests for the dashboard runtime
//!
//! Tests are organized by topic:
//! - `support` - Manual build worker, recording sink and fixtures
//! - `binding_flow` - State transitions with builds completed by hand
//! - `threaded` - Full sessions on the background worker thread
//! - `config_files` - Configuration and log files on disk

mod support;
