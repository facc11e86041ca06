//! Testing infrastructure for tokentrace tests.
//!
//! This crate provides utilities for writing robust tests:
//! - `TraceBuilder`: fluent construction of JSONL trace logs
//! - `TestWorld`: isolated temp directory with trace and config files
//! - `assertions`: checks over the CLI's JSON output

pub mod assertions;
pub mod fixtures;
pub mod world;

pub use fixtures::TraceBuilder;
pub use world::TestWorld;
