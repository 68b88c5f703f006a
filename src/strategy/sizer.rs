//! Position Sizer
//!
//! Converts a signal into per-leg order intents. Capital is split evenly
//! across legs and each leg is scaled by its beta:
//!
//! quantity_i = (capital_to_risk / legs) / price_i · beta_i · direction
//!
//! direction is +1 for ENTER_LONG_SPREAD and -1 for ENTER_SHORT_SPREAD, so a
//! long spread buys positive-beta legs and sells negative-beta legs. EXIT
//! emits a flatten intent per leg; the external ledger knows the size.
//!
//! `capital_to_risk` is supplied by the caller (ratio × current equity).

use std::collections::HashMap;

use crate::domain::{BetaVector, InstrumentId, OrderIntent, Signal};
use crate::strategy::params::PairConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingError {
    #[error("No beta for leg {0}")]
    MissingBeta(InstrumentId),
    #[error("No price for leg {0}")]
    MissingPrice(InstrumentId),
    #[error("Invalid price {price} for leg {instrument}")]
    InvalidPrice { instrument: InstrumentId, price: f64 },
    #[error("Capital to risk must be positive, got {0}")]
    NonPositiveCapital(f64),
}

impl SizingError {
    /// Fatal errors are programming/configuration faults, not market conditions
    pub fn is_fatal(&self) -> bool {
        matches!(self, SizingError::MissingBeta(_))
    }
}

#[derive(Debug, Clone)]
pub struct PositionSizer {
    legs: Vec<InstrumentId>,
}

impl PositionSizer {
    pub fn new(pair: &PairConfig) -> Self {
        Self {
            legs: vec![pair.leg_a.clone(), pair.leg_b.clone()],
        }
    }

    pub fn legs(&self) -> &[InstrumentId] {
        &self.legs
    }

    /// Intents for `signal`, one per leg (legs with a zero quantity are dropped)
    pub fn size(
        &self,
        signal: Signal,
        betas: &BetaVector,
        prices: &HashMap<InstrumentId, f64>,
        capital_to_risk: f64,
    ) -> Result<Vec<OrderIntent>, SizingError> {
        let betas_per_leg = self
            .legs
            .iter()
            .map(|leg| {
                betas
                    .get(leg)
                    .map(|beta| (leg, beta))
                    .ok_or_else(|| SizingError::MissingBeta(leg.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let direction = match signal {
            Signal::Hold => return Ok(Vec::new()),
            Signal::Exit => {
                return Ok(self.legs.iter().cloned().map(OrderIntent::flatten).collect());
            }
            Signal::EnterLongSpread => 1.0,
            Signal::EnterShortSpread => -1.0,
        };

        if !capital_to_risk.is_finite() || capital_to_risk <= 0.0 {
            return Err(SizingError::NonPositiveCapital(capital_to_risk));
        }
        let notional = capital_to_risk / self.legs.len() as f64;

        let mut intents = Vec::with_capacity(self.legs.len());
        for (leg, beta) in betas_per_leg {
            let price = *prices
                .get(leg)
                .ok_or_else(|| SizingError::MissingPrice(leg.clone()))?;
            if !price.is_finite() || price <= 0.0 {
                return Err(SizingError::InvalidPrice {
                    instrument: leg.clone(),
                    price,
                });
            }

            let quantity = (notional / price) * beta * direction;
            if quantity == 0.0 {
                tracing::debug!(leg = %leg, "Zero beta, no order for leg");
                continue;
            }
            intents.push(OrderIntent::market(leg.clone(), quantity));
        }
        Ok(intents)
    }
}
