//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{parse_timestamp, ReplayPeriod};
use crate::strategy::params::{ConfigError, PairConfig, SignalThresholds, StrategyConfig};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub pair: PairSection,
    #[serde(default)]
    pub strategy: StrategySection,
    #[serde(default)]
    pub sizing: SizingSection,
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// The two instruments traded as a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSection {
    pub leg_a: String,
    pub leg_b: String,
}

/// Strategy configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    /// Bars used for estimation and for the spread statistics
    pub formation_window: usize,
    /// |z| at which a position is opened
    pub entry_threshold: f64,
    /// |z| under which an open position is closed
    pub exit_threshold: f64,
    /// Re-fit the hedge ratio every N aligned bars
    pub reestimate_every: usize,
    /// Betas in force until the first successful estimation
    pub initial_beta_a: f64,
    pub initial_beta_b: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        let defaults = StrategyConfig::default();
        Self {
            formation_window: defaults.formation_window,
            entry_threshold: defaults.thresholds.entry,
            exit_threshold: defaults.thresholds.exit,
            reestimate_every: defaults.reestimate_every,
            initial_beta_a: defaults.initial_beta_a,
            initial_beta_b: defaults.initial_beta_b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingSection {
    /// Fraction of account equity put at risk per entry, in (0, 1]
    pub capital_to_risk_ratio: f64,
}

impl Default for SizingSection {
    fn default() -> Self {
        Self {
            capital_to_risk_ratio: StrategyConfig::default().capital_to_risk_ratio,
        }
    }
}

/// Backtest configuration section (optional)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    /// Paper account cash at the start of the replay
    pub starting_balance: f64,
    /// Bar CSV for leg A
    pub leg_a_csv: Option<String>,
    /// Bar CSV for leg B
    pub leg_b_csv: Option<String>,
    /// Where diagnostics.csv and the ledger reports are written
    pub report_dir: String,
    /// First bar time replayed (inclusive)
    pub start: Option<String>,
    /// Last bar time replayed (inclusive)
    pub end: Option<String>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            starting_balance: 100_000.0,
            leg_a_csv: None,
            leg_b_csv: None,
            report_dir: "report".to_string(),
            start: None,
            end: None,
        }
    }
}

impl BacktestSection {
    pub fn leg_a_path(&self) -> Option<PathBuf> {
        self.leg_a_csv.as_deref().map(expand_path)
    }

    pub fn leg_b_path(&self) -> Option<PathBuf> {
        self.leg_b_csv.as_deref().map(expand_path)
    }

    /// Get report directory with environment variable override
    /// Checks PAIR_ARB_REPORT_DIR env var first, falls back to config value
    pub fn report_path(&self) -> PathBuf {
        let dir = std::env::var("PAIR_ARB_REPORT_DIR").unwrap_or_else(|_| self.report_dir.clone());
        expand_path(&dir)
    }

    /// Replay bounds from `start` / `end`
    pub fn replay_period(&self) -> Result<ReplayPeriod, LoadError> {
        let start = parse_bound("start", self.start.as_deref())?;
        let end = parse_bound("end", self.end.as_deref())?;
        ReplayPeriod::new(start, end).map_err(|e| LoadError::Backtest(e.to_string()))
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, LoadError> {
    raw.map(|value| {
        parse_timestamp(value)
            .ok_or_else(|| LoadError::Backtest(format!("{} is not a valid time: {:?}", name, value)))
    })
    .transpose()
}

/// Logging configuration section (optional)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    Validation(#[from] ConfigError),
    #[error("Invalid backtest section: {0}")]
    Backtest(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, LoadError> {
    let content = std::fs::read_to_string(path)?;
    Config::from_toml(&content)
}

impl Config {
    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self, LoadError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), LoadError> {
        StrategyConfig::from(self).validate()?;

        let balance = self.backtest.starting_balance;
        if !balance.is_finite() || balance <= 0.0 {
            return Err(LoadError::Backtest(format!(
                "starting_balance must be > 0, got {}",
                balance
            )));
        }
        if self.backtest.report_dir.is_empty() {
            return Err(LoadError::Backtest("report_dir cannot be empty".to_string()));
        }
        self.backtest.replay_period()?;

        Ok(())
    }
}

// Conversion from Config to StrategyConfig
impl From<&Config> for StrategyConfig {
    fn from(config: &Config) -> Self {
        StrategyConfig {
            pair: PairConfig::new(config.pair.leg_a.as_str(), config.pair.leg_b.as_str()),
            formation_window: config.strategy.formation_window,
            thresholds: SignalThresholds::new(
                config.strategy.entry_threshold,
                config.strategy.exit_threshold,
            ),
            reestimate_every: config.strategy.reestimate_every,
            initial_beta_a: config.strategy.initial_beta_a,
            initial_beta_b: config.strategy.initial_beta_b,
            capital_to_risk_ratio: config.sizing.capital_to_risk_ratio,
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[pair]
leg_a = "BTC-USD"
leg_b = "ETH-USD"

[strategy]
formation_window = 120
entry_threshold = 2.5
exit_threshold = 0.25
reestimate_every = 5
initial_beta_a = 1.0
initial_beta_b = -1.0

[sizing]
capital_to_risk_ratio = 0.02

[backtest]
starting_balance = 50000.0
leg_a_csv = "data/btc.csv"
leg_b_csv = "data/eth.csv"
report_dir = "out"
start = "2024-01-02"
end = "2024-02-20 00:00:00"

[logging]
level = "debug"
"#
        .to_string()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.pair.leg_a, "BTC-USD");
        assert_eq!(config.strategy.formation_window, 120);
        assert_eq!(config.strategy.entry_threshold, 2.5);
        assert_eq!(config.sizing.capital_to_risk_ratio, 0.02);
        assert_eq!(config.backtest.starting_balance, 50_000.0);
        assert_eq!(config.backtest.leg_a_path(), Some(PathBuf::from("data/btc.csv")));
        assert_eq!(config.logging.level, "debug");

        let period = config.backtest.replay_period().unwrap();
        assert_eq!(period.start, Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()));
        assert_eq!(period.end, Some(Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_defaults_for_optional_sections() {
        let config = Config::from_toml(
            r#"
[pair]
leg_a = "A"
leg_b = "B"
"#,
        )
        .unwrap();

        assert_eq!(config.strategy.formation_window, 200);
        assert_eq!(config.strategy.entry_threshold, 2.0);
        assert_eq!(config.strategy.exit_threshold, 0.5);
        assert_eq!(config.strategy.reestimate_every, 1);
        assert_eq!(config.sizing.capital_to_risk_ratio, 0.01);
        assert_eq!(config.backtest.starting_balance, 100_000.0);
        assert_eq!(config.backtest.report_dir, "report");
        assert!(config.backtest.leg_a_csv.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.backtest.replay_period().unwrap().is_unbounded());
    }

    #[test]
    fn test_strategy_config_conversion() {
        let config = Config::from_toml(&create_valid_config()).unwrap();
        let strategy = StrategyConfig::from(&config);

        assert_eq!(strategy.pair.leg_a.as_str(), "BTC-USD");
        assert_eq!(strategy.pair.leg_b.as_str(), "ETH-USD");
        assert_eq!(strategy.thresholds, SignalThresholds::new(2.5, 0.25));
        assert_eq!(strategy.reestimate_every, 5);
        assert_eq!(strategy.capital_to_risk_ratio, 0.02);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), LoadError::Io(_)));
    }

    #[test]
    fn test_missing_pair_section() {
        let result = Config::from_toml("[strategy]\nformation_window = 10\n");
        assert!(matches!(result.unwrap_err(), LoadError::Parse(_)));
    }

    #[test]
    fn test_invalid_thresholds() {
        let invalid = create_valid_config().replace("exit_threshold = 0.25", "exit_threshold = 3.0");
        let result = Config::from_toml(&invalid);
        assert!(matches!(
            result.unwrap_err(),
            LoadError::Validation(ConfigError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn test_duplicate_legs_rejected() {
        let invalid = create_valid_config().replace("\"ETH-USD\"", "\"BTC-USD\"");
        let result = Config::from_toml(&invalid);
        assert!(matches!(
            result.unwrap_err(),
            LoadError::Validation(ConfigError::DuplicateLeg(_))
        ));
    }

    #[test]
    fn test_invalid_capital_ratio() {
        let invalid = create_valid_config()
            .replace("capital_to_risk_ratio = 0.02", "capital_to_risk_ratio = 1.5");
        let result = Config::from_toml(&invalid);
        assert!(matches!(
            result.unwrap_err(),
            LoadError::Validation(ConfigError::InvalidCapitalRatio(_))
        ));
    }

    #[test]
    fn test_invalid_starting_balance() {
        let invalid = create_valid_config()
            .replace("starting_balance = 50000.0", "starting_balance = 0.0");
        assert!(matches!(
            Config::from_toml(&invalid).unwrap_err(),
            LoadError::Backtest(_)
        ));
    }

    #[test]
    fn test_invalid_replay_bounds() {
        let garbled = create_valid_config().replace("start = \"2024-01-02\"", "start = \"soon\"");
        assert!(matches!(
            Config::from_toml(&garbled).unwrap_err(),
            LoadError::Backtest(msg) if msg.contains("start")
        ));

        let reversed = create_valid_config().replace("start = \"2024-01-02\"", "start = \"2024-03-01\"");
        assert!(matches!(
            Config::from_toml(&reversed).unwrap_err(),
            LoadError::Backtest(_)
        ));
    }

    #[test]
    fn test_tilde_paths_expanded() {
        let section = BacktestSection {
            leg_a_csv: Some("~/bars/a.csv".to_string()),
            ..Default::default()
        };
        let path = section.leg_a_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("bars/a.csv"));
    }
}
