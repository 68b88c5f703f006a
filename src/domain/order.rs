//! Order Intents
//!
//! What the engine hands to the execution layer. Intents are ephemeral:
//! built per decision, consumed immediately, never retained by the core.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::instrument::InstrumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side implied by the sign of a signed quantity
    pub fn from_signed(quantity: f64) -> Self {
        if quantity >= 0.0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Instruction for one leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderIntent {
    /// Market order; `quantity` is signed (negative sells)
    Market {
        instrument: InstrumentId,
        side: OrderSide,
        quantity: f64,
    },
    /// Close whatever the external ledger holds in this instrument
    Flatten { instrument: InstrumentId },
}

impl OrderIntent {
    pub fn market(instrument: InstrumentId, quantity: f64) -> Self {
        OrderIntent::Market {
            instrument,
            side: OrderSide::from_signed(quantity),
            quantity,
        }
    }

    pub fn flatten(instrument: InstrumentId) -> Self {
        OrderIntent::Flatten { instrument }
    }

    pub fn instrument(&self) -> &InstrumentId {
        match self {
            OrderIntent::Market { instrument, .. } | OrderIntent::Flatten { instrument } => instrument,
        }
    }

    /// Signed quantity of a market intent
    pub fn signed_quantity(&self) -> Option<f64> {
        match self {
            OrderIntent::Market { quantity, .. } => Some(*quantity),
            OrderIntent::Flatten { .. } => None,
        }
    }

    pub fn side(&self) -> Option<OrderSide> {
        match self {
            OrderIntent::Market { side, .. } => Some(*side),
            OrderIntent::Flatten { .. } => None,
        }
    }
}

impl fmt::Display for OrderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderIntent::Market { instrument, side, quantity } => {
                write!(f, "{} {:.6} {}", side, quantity.abs(), instrument)
            }
            OrderIntent::Flatten { instrument } => write!(f, "FLATTEN {}", instrument),
        }
    }
}
