//! Execution and account ports
//!
//! The engine never fills, clears or books orders itself. It asks the
//! account for equity at signal time and hands intents to the execution
//! layer; both live behind these traits.

use thiserror::Error;

use crate::domain::OrderIntent;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Order rejected: {0}")]
    Rejected(String),
    #[error("No price available for {0}")]
    NoPrice(String),
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account unavailable: {0}")]
    Unavailable(String),
    #[error("Equity cannot be valued: {0}")]
    Valuation(String),
}

/// Sink for order intents
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionPort {
    fn submit(&mut self, intent: &OrderIntent) -> Result<(), ExecutionError>;
}

/// Read-only view of the trading account
#[cfg_attr(test, mockall::automock)]
pub trait AccountPort {
    /// Current total equity in quote currency
    fn equity(&self) -> Result<f64, AccountError>;
}
