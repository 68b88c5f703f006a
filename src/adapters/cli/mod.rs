//! CLI Adapter
//!
//! Command-line interface for the pair-arb engine.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{BacktestCmd, CliApp, Command, OutputFormat, SynthCmd, ValidateCmd};
