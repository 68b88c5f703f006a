//! Hedge Coefficients
//!
//! `BetaVector` is an immutable snapshot of the per-leg weights that turn
//! two prices into a stationary spread. Re-estimation builds a new vector
//! and swaps it in whole; nothing mutates one in place.

use serde::Serialize;

use super::instrument::{InstrumentId, Leg};

/// Per-leg hedge coefficients for one pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetaVector {
    legs: [(InstrumentId, f64); 2],
}

impl BetaVector {
    pub fn new(leg_a: InstrumentId, beta_a: f64, leg_b: InstrumentId, beta_b: f64) -> Self {
        Self {
            legs: [(leg_a, beta_a), (leg_b, beta_b)],
        }
    }

    /// Coefficient for an instrument, if it belongs to this pair
    pub fn get(&self, instrument: &InstrumentId) -> Option<f64> {
        self.legs
            .iter()
            .find(|(id, _)| id == instrument)
            .map(|(_, beta)| *beta)
    }

    pub fn for_leg(&self, leg: Leg) -> f64 {
        self.legs[leg.index()].1
    }

    pub fn instrument(&self, leg: Leg) -> &InstrumentId {
        &self.legs[leg.index()].0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InstrumentId, f64)> {
        self.legs.iter().map(|(id, beta)| (id, *beta))
    }

    /// Units of leg B per unit of leg A implied by the vector (-b_A / b_B).
    ///
    /// None when leg B's coefficient is zero.
    pub fn hedge_ratio(&self) -> Option<f64> {
        let beta_b = self.for_leg(Leg::B);
        if beta_b == 0.0 {
            return None;
        }
        Some(-self.for_leg(Leg::A) / beta_b)
    }

    pub fn is_finite(&self) -> bool {
        self.legs.iter().all(|(_, beta)| beta.is_finite())
    }
}
