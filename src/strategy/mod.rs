//! Strategy Layer - Cointegration Pair Trading
//!
//! The numerical core of the engine, leaf-first:
//! - `hedge_ratio`: rolling Johansen fit producing the BetaVector
//! - `spread`: spread series, rolling mean/std, z-score
//! - `signal_machine`: threshold state machine (FLAT / LONG / SHORT spread)
//! - `sizer`: capital-proportional per-leg order intents
//! - `params`: configuration and its validation

pub mod params;
pub mod hedge_ratio;
pub mod spread;
pub mod signal_machine;
pub mod sizer;

pub use params::{ConfigError, PairConfig, SignalThresholds, StrategyConfig};
pub use hedge_ratio::{johansen, BetaRefresh, EstimationError, HedgeRatioEstimator, JohansenFit};
pub use spread::{SpreadSample, SpreadStats, SpreadTracker};
pub use signal_machine::{Decision, SignalStateMachine};
pub use sizer::{PositionSizer, SizingError};
