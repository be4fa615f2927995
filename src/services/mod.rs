//! Service layer for vis-cli.
//!
//! Orchestration logic separated from UI concerns; the CLI drives it and
//! renders the events it emits.

pub mod batch;

pub use batch::{BatchCounts, BatchEvent, BatchReport, BatchRunner, DEFAULT_WORKERS};
