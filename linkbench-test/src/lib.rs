//! Test utilities for the linkbench crates.
//!
//! See the modules for all available utilities.

pub mod tracing;
