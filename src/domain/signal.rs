//! Signals and Position State
//!
//! Closed set of decisions the state machine can emit, and the three
//! position states it moves between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision emitted once per processed bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Hold,
    /// Spread is stretched downward: buy the combination
    EnterLongSpread,
    /// Spread is stretched upward: sell the combination
    EnterShortSpread,
    Exit,
}

impl Signal {
    pub fn is_entry(&self) -> bool {
        matches!(self, Signal::EnterLongSpread | Signal::EnterShortSpread)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hold => write!(f, "HOLD"),
            Signal::EnterLongSpread => write!(f, "ENTER_LONG_SPREAD"),
            Signal::EnterShortSpread => write!(f, "ENTER_SHORT_SPREAD"),
            Signal::Exit => write!(f, "EXIT"),
        }
    }
}

/// Position held in the spread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    #[default]
    Flat,
    LongSpread,
    ShortSpread,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::LongSpread => write!(f, "LONG_SPREAD"),
            PositionState::ShortSpread => write!(f, "SHORT_SPREAD"),
        }
    }
}
