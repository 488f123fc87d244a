//! Command-line interface module.
//!
//! Provides the report flags and the `report-run` command report.

pub mod args;
pub mod exec;
