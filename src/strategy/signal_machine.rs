//! Signal State Machine
//!
//! Maps the spread z-score and current position to one decision. Rules,
//! first match wins:
//!
//! 1. In a position and |z| < exit      -> EXIT, go FLAT
//! 2. FLAT and z > entry                -> ENTER_SHORT_SPREAD
//! 3. FLAT and z < -entry               -> ENTER_LONG_SPREAD
//! 4. Otherwise                         -> HOLD
//!
//! A missing z-score is always HOLD with no transition.

use crate::domain::{PositionState, Signal};
use crate::strategy::params::{ConfigError, SignalThresholds};

/// A decision plus the state it leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub signal: Signal,
    pub next: PositionState,
}

#[derive(Debug, Clone)]
pub struct SignalStateMachine {
    thresholds: SignalThresholds,
    state: PositionState,
}

impl SignalStateMachine {
    /// Rejects thresholds unless entry > exit > 0
    pub fn new(thresholds: SignalThresholds) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            state: PositionState::Flat,
        })
    }

    /// Decision for `z` from `state`, without committing it
    pub fn decide(&self, z_score: Option<f64>, state: PositionState) -> Decision {
        let hold = Decision {
            signal: Signal::Hold,
            next: state,
        };
        let Some(z) = z_score.filter(|z| z.is_finite()) else {
            return hold;
        };

        match state {
            PositionState::LongSpread | PositionState::ShortSpread if z.abs() < self.thresholds.exit => Decision {
                signal: Signal::Exit,
                next: PositionState::Flat,
            },
            PositionState::Flat if z > self.thresholds.entry => Decision {
                signal: Signal::EnterShortSpread,
                next: PositionState::ShortSpread,
            },
            PositionState::Flat if z < -self.thresholds.entry => Decision {
                signal: Signal::EnterLongSpread,
                next: PositionState::LongSpread,
            },
            _ => hold,
        }
    }

    /// Decide from the machine's own state
    pub fn peek(&self, z_score: Option<f64>) -> Decision {
        self.decide(z_score, self.state)
    }

    /// Commit a decision previously obtained from `peek`
    pub fn commit(&mut self, decision: Decision) {
        if decision.next != self.state {
            tracing::info!(from = %self.state, to = %decision.next, signal = %decision.signal, "Position state change");
        }
        self.state = decision.next;
    }

    /// Decide and commit in one step
    pub fn on_zscore(&mut self, z_score: Option<f64>) -> Signal {
        let decision = self.peek(z_score);
        self.commit(decision);
        decision.signal
    }

    /// Force FLAT, e.g. when the engine is stopped or restarted
    pub fn force_flat(&mut self) {
        self.state = PositionState::Flat;
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn thresholds(&self) -> SignalThresholds {
        self.thresholds
    }
}
