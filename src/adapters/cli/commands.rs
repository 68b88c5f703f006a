//! CLI Command Definitions
//!
//! Argument structures for all pair-arb commands.
//! Uses clap derive macros for argument parsing.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pair-arb - Cointegration pair-trading engine
#[derive(Parser, Debug)]
#[command(
    name = "pair-arb",
    version = env!("CARGO_PKG_VERSION"),
    about = "Cointegration pair-trading engine",
    long_about = "pair-arb estimates a Johansen hedge ratio over a rolling formation window, \
                  trades the z-score of the resulting spread, and replays bar files through \
                  a fill-at-close paper ledger."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay two bar files through the engine with a paper ledger
    Backtest(BacktestCmd),

    /// Write a synthetic cointegrated pair as two bar files
    Synth(SynthCmd),

    /// Load and validate a configuration file
    Validate(ValidateCmd),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Run a backtest
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/pair.toml")]
    pub config: PathBuf,

    /// Bar CSV for leg A (overrides [backtest] leg_a_csv)
    #[arg(long, value_name = "CSV")]
    pub leg_a: Option<PathBuf>,

    /// Bar CSV for leg B (overrides [backtest] leg_b_csv)
    #[arg(long, value_name = "CSV")]
    pub leg_b: Option<PathBuf>,

    /// Directory for diagnostics.csv and the ledger reports (overrides [backtest] report_dir)
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// First bar time to replay, inclusive (overrides [backtest] start)
    #[arg(long, value_name = "TIME")]
    pub start: Option<String>,

    /// Last bar time to replay, inclusive (overrides [backtest] end)
    #[arg(long, value_name = "TIME")]
    pub end: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Print every fill
    #[arg(long)]
    pub fills: bool,
}

/// Generate synthetic bar files
#[derive(Parser, Debug)]
pub struct SynthCmd {
    /// Output directory for leg_a.csv and leg_b.csv
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Number of bars
    #[arg(long, value_name = "N", default_value = "1000")]
    pub bars: usize,

    /// True hedge ratio (units of B per unit of A)
    #[arg(long, value_name = "RATIO", default_value = "2.0")]
    pub ratio: f64,

    /// Std dev of the stationary noise on leg B
    #[arg(long, value_name = "STD", default_value = "0.5")]
    pub noise: f64,

    /// RNG seed
    #[arg(long, value_name = "SEED", default_value = "42")]
    pub seed: u64,

    /// Minutes between bars
    #[arg(long, value_name = "MINUTES", default_value = "60")]
    pub interval: i64,
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct ValidateCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/pair.toml")]
    pub config: PathBuf,
}

impl Command {
    /// Configuration file the command reads, if any
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Backtest(cmd) => Some(&cmd.config),
            Command::Validate(cmd) => Some(&cmd.config),
            Command::Synth(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_app_parse_backtest() {
        let args = vec!["pair-arb", "backtest", "--config", "pair.toml"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Backtest(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("pair.toml"));
                assert_eq!(cmd.format, OutputFormat::Text);
                assert!(cmd.leg_a.is_none());
                assert!(cmd.start.is_none() && cmd.end.is_none());
                assert!(!cmd.fills);
            }
            _ => panic!("Expected Backtest command"),
        }
    }

    #[test]
    fn test_cli_app_parse_backtest_with_overrides() {
        let args = vec![
            "pair-arb", "backtest",
            "--leg-a", "a.csv",
            "--leg-b", "b.csv",
            "--report-dir", "out",
            "--start", "2024-01-02",
            "--end", "2024-02-20 00:00:00",
            "--format", "json",
            "--fills",
        ];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Backtest(cmd) => {
                assert_eq!(cmd.leg_a, Some(PathBuf::from("a.csv")));
                assert_eq!(cmd.leg_b, Some(PathBuf::from("b.csv")));
                assert_eq!(cmd.report_dir, Some(PathBuf::from("out")));
                assert_eq!(cmd.start.as_deref(), Some("2024-01-02"));
                assert_eq!(cmd.end.as_deref(), Some("2024-02-20 00:00:00"));
                assert_eq!(cmd.format, OutputFormat::Json);
                assert!(cmd.fills);
            }
            _ => panic!("Expected Backtest command"),
        }
    }

    #[test]
    fn test_cli_app_parse_synth() {
        let args = vec!["pair-arb", "synth", "--out-dir", "data", "--bars", "500", "--seed", "7"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Synth(cmd) => {
                assert_eq!(cmd.out_dir, PathBuf::from("data"));
                assert_eq!(cmd.bars, 500);
                assert_eq!(cmd.seed, 7);
                assert_eq!(cmd.ratio, 2.0);
                assert_eq!(cmd.interval, 60);
            }
            _ => panic!("Expected Synth command"),
        }
    }

    #[test]
    fn test_synth_requires_out_dir() {
        assert!(CliApp::try_parse_from(vec!["pair-arb", "synth"]).is_err());
    }

    #[test]
    fn test_invalid_format_rejected() {
        let args = vec!["pair-arb", "backtest", "--format", "xml"];
        assert!(CliApp::try_parse_from(args).is_err());
    }

    #[test]
    fn test_global_flags() {
        let args = vec!["pair-arb", "-v", "--debug", "validate"];
        let app = CliApp::try_parse_from(args).unwrap();

        assert!(app.verbose);
        assert!(app.debug);
    }

    #[test]
    fn test_default_config_path() {
        let args = vec!["pair-arb", "validate"];
        let app = CliApp::try_parse_from(args).unwrap();

        assert_eq!(app.command.config_path(), Some(&PathBuf::from("config/pair.toml")));
    }
}
