//! Strategy Parameters
//!
//! Configuration structs for the pair engine. Defaults follow the
//! reference deployment: 200-bar formation window, enter at |z| > 2.0,
//! exit at |z| < 0.5, risk 1% of equity per entry.

use serde::{Deserialize, Serialize};

use crate::domain::{BetaVector, InstrumentId};

/// The two instruments traded against each other
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub leg_a: InstrumentId,
    pub leg_b: InstrumentId,
}

impl PairConfig {
    pub fn new(leg_a: impl Into<InstrumentId>, leg_b: impl Into<InstrumentId>) -> Self {
        Self {
            leg_a: leg_a.into(),
            leg_b: leg_b.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leg_a.is_empty() {
            return Err(ConfigError::MissingLeg("leg_a"));
        }
        if self.leg_b.is_empty() {
            return Err(ConfigError::MissingLeg("leg_b"));
        }
        if self.leg_a == self.leg_b {
            return Err(ConfigError::DuplicateLeg(self.leg_a.to_string()));
        }
        Ok(())
    }
}

/// Entry/exit z-score thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// Enter when |z| rises above this
    pub entry: f64,
    /// Exit when |z| falls below this
    pub exit: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self { entry: 2.0, exit: 0.5 }
    }
}

impl SignalThresholds {
    pub fn new(entry: f64, exit: f64) -> Self {
        Self { entry, exit }
    }

    /// entry > exit > 0, otherwise a position could open and close on the same tick
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.exit.is_finite() || self.exit <= 0.0 {
            return Err(ConfigError::InvalidExitThreshold(self.exit));
        }
        if !self.entry.is_finite() || self.entry <= self.exit {
            return Err(ConfigError::ThresholdOrder {
                entry: self.entry,
                exit: self.exit,
            });
        }
        Ok(())
    }
}

/// Main strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub pair: PairConfig,
    /// Bars used for estimation and rolling spread statistics (W)
    pub formation_window: usize,
    pub thresholds: SignalThresholds,
    /// Re-estimate betas every K aligned bars (1 = every bar)
    pub reestimate_every: usize,
    /// Betas in force until the first successful estimation
    pub initial_beta_a: f64,
    pub initial_beta_b: f64,
    /// Fraction of current equity committed on each entry
    pub capital_to_risk_ratio: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            pair: PairConfig::new("LEG_A", "LEG_B"),
            formation_window: 200,
            thresholds: SignalThresholds::default(),
            reestimate_every: 1,
            initial_beta_a: 1.0,
            initial_beta_b: -1.0,
            capital_to_risk_ratio: 0.01,
        }
    }
}

impl StrategyConfig {
    pub fn new(pair: PairConfig) -> Self {
        Self {
            pair,
            ..Default::default()
        }
    }

    pub fn with_formation_window(mut self, window: usize) -> Self {
        self.formation_window = window;
        self
    }

    pub fn with_thresholds(mut self, entry: f64, exit: f64) -> Self {
        self.thresholds = SignalThresholds::new(entry, exit);
        self
    }

    pub fn with_reestimate_every(mut self, bars: usize) -> Self {
        self.reestimate_every = bars;
        self
    }

    pub fn with_initial_betas(mut self, beta_a: f64, beta_b: f64) -> Self {
        self.initial_beta_a = beta_a;
        self.initial_beta_b = beta_b;
        self
    }

    pub fn with_capital_to_risk_ratio(mut self, ratio: f64) -> Self {
        self.capital_to_risk_ratio = ratio;
        self
    }

    /// BetaVector the engine starts with and returns to on reset
    pub fn initial_betas(&self) -> BetaVector {
        BetaVector::new(
            self.pair.leg_a.clone(),
            self.initial_beta_a,
            self.pair.leg_b.clone(),
            self.initial_beta_b,
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pair.validate()?;
        if self.formation_window < 2 {
            return Err(ConfigError::InvalidFormationWindow(self.formation_window));
        }
        self.thresholds.validate()?;
        if self.reestimate_every == 0 {
            return Err(ConfigError::InvalidReestimateCadence);
        }
        if !self.initial_beta_a.is_finite()
            || !self.initial_beta_b.is_finite()
            || (self.initial_beta_a == 0.0 && self.initial_beta_b == 0.0)
        {
            return Err(ConfigError::InvalidInitialBetas(self.initial_beta_a, self.initial_beta_b));
        }
        if !(self.capital_to_risk_ratio > 0.0 && self.capital_to_risk_ratio <= 1.0) {
            return Err(ConfigError::InvalidCapitalRatio(self.capital_to_risk_ratio));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing instrument for {0}")]
    MissingLeg(&'static str),
    #[error("Both legs reference the same instrument: {0}")]
    DuplicateLeg(String),
    #[error("Invalid formation window: {0} (minimum 2)")]
    InvalidFormationWindow(usize),
    #[error("Invalid exit threshold: {0} (must be > 0)")]
    InvalidExitThreshold(f64),
    #[error("Entry threshold {entry} must be greater than exit threshold {exit}")]
    ThresholdOrder { entry: f64, exit: f64 },
    #[error("Re-estimation cadence must be at least one bar")]
    InvalidReestimateCadence,
    #[error("Invalid initial betas: ({0}, {1})")]
    InvalidInitialBetas(f64, f64),
    #[error("Invalid capital-to-risk ratio: {0} (must be 0 < ratio <= 1)")]
    InvalidCapitalRatio(f64),
}
