//! Helpers to write command-line report programs.
//!
//! A program implements [`lifecycle::Program`] (or, for reports,
//! [`report::Report`] wrapped in a [`report::ReportProgram`]) and hands itself
//! to [`lifecycle::run`], which parses and validates the command line,
//! resolves the output sink, executes, and finalizes. Report programs print
//! to stdout by default and email their output when `-e ADDR` is given.

pub mod cli;
pub mod config;
pub mod constants;
pub mod lifecycle;
pub mod logging;
pub mod mail;
pub mod report;
pub mod sink;

pub use lifecycle::{Invocation, Program, UsageError};
pub use report::{Report, ReportProgram};
pub use sink::{ConsoleSink, EmailSink, Sink};
