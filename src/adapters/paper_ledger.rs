//! Paper Ledger
//!
//! Fill-at-close simulation of the account and execution side for
//! backtests. Every market intent fills in full at the instrument's last
//! marked close; `Flatten` closes whatever is held. No fees, slippage or
//! partial fills.
//!
//! Equity = cash + Σ quantity · last close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::{InstrumentId, OrderIntent, OrderSide};
use crate::ports::{AccountError, AccountPort, ExecutionError, ExecutionPort};

/// Signed holding in one instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerPosition {
    /// Negative when short
    pub quantity: f64,
    /// Average entry price of the open quantity
    pub avg_price: f64,
    pub realized_pnl: f64,
}

impl LedgerPosition {
    pub fn is_open(&self) -> bool {
        self.quantity != 0.0
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.avg_price) * self.quantity
    }

    fn apply(&mut self, quantity: f64, price: f64) {
        let held = self.quantity;
        if held == 0.0 || held.signum() == quantity.signum() {
            let size = held.abs() + quantity.abs();
            self.avg_price = (self.avg_price * held.abs() + price * quantity.abs()) / size;
            self.quantity = held + quantity;
            return;
        }

        let closed = quantity.abs().min(held.abs());
        self.realized_pnl += closed * (price - self.avg_price) * held.signum();
        self.quantity = held + quantity;

        if self.quantity.abs() < f64::EPSILON * held.abs().max(1.0) {
            self.quantity = 0.0;
            self.avg_price = 0.0;
        } else if self.quantity.signum() != held.signum() {
            // Flipped through zero: the remainder opened at this price
            self.avg_price = price;
        }
    }
}

/// A simulated execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperFill {
    pub id: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub instrument: InstrumentId,
    pub side: OrderSide,
    /// Signed quantity
    pub quantity: f64,
    pub price: f64,
}

impl PaperFill {
    pub fn notional(&self) -> f64 {
        self.quantity.abs() * self.price
    }
}

/// Account snapshot for reports
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub starting_balance: f64,
    pub cash: f64,
    pub equity: f64,
    pub return_pct: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub fills: usize,
    pub volume: f64,
    pub max_drawdown_pct: f64,
    pub positions: BTreeMap<String, LedgerPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperLedger {
    starting_balance: f64,
    cash: f64,
    positions: HashMap<InstrumentId, LedgerPosition>,
    last_prices: HashMap<InstrumentId, f64>,
    last_timestamp: Option<DateTime<Utc>>,
    fills: Vec<PaperFill>,
    next_fill_id: u64,
    peak_equity: f64,
    max_drawdown_pct: f64,
}

impl PaperLedger {
    pub fn new(starting_balance: f64) -> Self {
        tracing::info!(starting_balance, "Paper ledger initialized");
        Self {
            starting_balance,
            cash: starting_balance,
            positions: HashMap::new(),
            last_prices: HashMap::new(),
            last_timestamp: None,
            fills: Vec::new(),
            next_fill_id: 1,
            peak_equity: starting_balance,
            max_drawdown_pct: 0.0,
        }
    }

    /// Record the latest close for an instrument; fills use it
    pub fn mark(&mut self, instrument: &InstrumentId, price: f64, timestamp: DateTime<Utc>) {
        if !(price.is_finite() && price > 0.0) {
            return;
        }
        self.last_prices.insert(instrument.clone(), price);
        self.last_timestamp = Some(timestamp);

        let equity = self.mark_to_market();
        if equity > self.peak_equity {
            self.peak_equity = equity;
        } else if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * 100.0;
            self.max_drawdown_pct = self.max_drawdown_pct.max(drawdown);
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, instrument: &InstrumentId) -> Option<&LedgerPosition> {
        self.positions.get(instrument)
    }

    /// Signed quantity held, zero when flat
    pub fn quantity(&self, instrument: &InstrumentId) -> f64 {
        self.positions.get(instrument).map_or(0.0, |p| p.quantity)
    }

    pub fn last_price(&self, instrument: &InstrumentId) -> Option<f64> {
        self.last_prices.get(instrument).copied()
    }

    pub fn fills(&self) -> &[PaperFill] {
        &self.fills
    }

    fn mark_to_market(&self) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .map(|(id, p)| p.quantity * self.last_prices.get(id).copied().unwrap_or(p.avg_price))
                .sum::<f64>()
    }

    fn fill(&mut self, instrument: &InstrumentId, quantity: f64) -> Result<(), ExecutionError> {
        if !quantity.is_finite() {
            return Err(ExecutionError::Rejected(format!(
                "non-finite quantity for {}",
                instrument
            )));
        }
        let price = self
            .last_price(instrument)
            .ok_or_else(|| ExecutionError::NoPrice(instrument.to_string()))?;

        self.positions
            .entry(instrument.clone())
            .or_default()
            .apply(quantity, price);
        self.cash -= quantity * price;

        let fill = PaperFill {
            id: self.next_fill_id,
            timestamp: self.last_timestamp,
            instrument: instrument.clone(),
            side: OrderSide::from_signed(quantity),
            quantity,
            price,
        };
        self.next_fill_id += 1;
        tracing::info!(
            fill_id = fill.id,
            instrument = %instrument,
            side = %fill.side,
            quantity = quantity.abs(),
            price,
            "Paper fill"
        );
        self.fills.push(fill);
        Ok(())
    }

    pub fn summary(&self) -> LedgerSummary {
        let equity = self.mark_to_market();
        let realized_pnl = self.positions.values().map(|p| p.realized_pnl).sum();
        let unrealized_pnl = self
            .positions
            .iter()
            .filter_map(|(id, p)| self.last_prices.get(id).map(|&px| p.unrealized_pnl(px)))
            .sum();
        let return_pct = if self.starting_balance > 0.0 {
            (equity - self.starting_balance) / self.starting_balance * 100.0
        } else {
            0.0
        };

        LedgerSummary {
            starting_balance: self.starting_balance,
            cash: self.cash,
            equity,
            return_pct,
            realized_pnl,
            unrealized_pnl,
            fills: self.fills.len(),
            volume: self.fills.iter().map(PaperFill::notional).sum(),
            max_drawdown_pct: self.max_drawdown_pct,
            positions: self
                .positions
                .iter()
                .map(|(id, p)| (id.to_string(), p.clone()))
                .collect(),
        }
    }
}

impl AccountPort for PaperLedger {
    fn equity(&self) -> Result<f64, AccountError> {
        let equity = self.mark_to_market();
        if !equity.is_finite() {
            return Err(AccountError::Valuation(format!("equity is {}", equity)));
        }
        Ok(equity)
    }
}

impl ExecutionPort for PaperLedger {
    fn submit(&mut self, intent: &OrderIntent) -> Result<(), ExecutionError> {
        match intent {
            OrderIntent::Market { instrument, quantity, .. } => self.fill(instrument, *quantity),
            OrderIntent::Flatten { instrument } => {
                let held = self.quantity(instrument);
                if held == 0.0 {
                    tracing::debug!(instrument = %instrument, "Nothing to flatten");
                    return Ok(());
                }
                self.fill(instrument, -held)
            }
        }
    }
}
