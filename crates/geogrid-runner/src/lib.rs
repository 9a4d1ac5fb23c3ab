//! # geogrid-runner
//!
//! Command-line driver behind the `geogrid-static` binary. It resolves the
//! configuration and dataset catalog, then hands the selected datasets to a
//! [`geogrid_tiler::Pipeline`].

pub mod cli;
mod error;

pub use error::RunnerError;

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
