//! Integration tests for the caching core
//!
//! Tests are organized by topic:
//! - `fixtures` - Shared upstream data fixtures
//! - `scenarios` - End-to-end builds for both dataset shapes
//! - `cache_builds` - Cache and builder working together

mod cache_builds;
mod fixtures;
