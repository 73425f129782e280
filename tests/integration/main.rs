//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below exercises one slice of the core against the mock
//! adapters in `mocks.rs`, plus real SQLite files in temp directories.

mod app_flow_tests;
mod pipeline_tests;
