//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits and the
//! outer surfaces of the engine:
//! - CLI: Command-line interface definitions
//! - CSV bars: Bar file loading and merging
//! - CSV diagnostics: Per-bar diagnostics file
//! - Ledger reports: Fills, positions and account CSVs after a backtest
//! - Paper ledger: Fill-at-close account and execution for backtests
//! - Synthetic: Seeded cointegrated pair generator

pub mod cli;
pub mod csv_bars;
pub mod diagnostics_csv;
pub mod ledger_reports;
pub mod paper_ledger;
pub mod synthetic;

pub use cli::CliApp;
pub use csv_bars::{merge_by_timestamp, BarSourceError, CsvBarSource};
pub use diagnostics_csv::CsvDiagnosticsWriter;
pub use ledger_reports::{write_reports, ReportError, ReportFiles};
pub use paper_ledger::{LedgerSummary, PaperFill, PaperLedger};
pub use synthetic::{generate_pair, SyntheticPair, SyntheticPairConfig};
