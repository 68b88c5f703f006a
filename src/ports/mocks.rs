//! In-memory port implementations that record calls and allow controlled
//! responses. Handy for tests and dry runs.

use super::diagnostics::{DiagnosticRecord, DiagnosticsError, DiagnosticsSink};
use super::execution::{AccountError, AccountPort, ExecutionError, ExecutionPort};
use crate::domain::OrderIntent;

/// Account + execution double with fixed equity
#[derive(Debug, Clone, Default)]
pub struct RecordingVenue {
    equity: Option<f64>,
    reject_orders: bool,
    submitted: Vec<OrderIntent>,
}

impl RecordingVenue {
    /// Venue reporting `equity` and accepting every order
    pub fn with_equity(equity: f64) -> Self {
        Self {
            equity: Some(equity),
            ..Default::default()
        }
    }

    /// Builder: reject every submitted order
    pub fn rejecting(mut self) -> Self {
        self.reject_orders = true;
        self
    }

    /// Builder: make equity lookups fail
    pub fn without_equity(mut self) -> Self {
        self.equity = None;
        self
    }

    /// Every intent passed to `submit`, accepted or not
    pub fn submitted(&self) -> &[OrderIntent] {
        &self.submitted
    }
}

impl AccountPort for RecordingVenue {
    fn equity(&self) -> Result<f64, AccountError> {
        self.equity
            .ok_or_else(|| AccountError::Unavailable("No equity configured".to_string()))
    }
}

impl ExecutionPort for RecordingVenue {
    fn submit(&mut self, intent: &OrderIntent) -> Result<(), ExecutionError> {
        self.submitted.push(intent.clone());
        if self.reject_orders {
            return Err(ExecutionError::Rejected(intent.to_string()));
        }
        Ok(())
    }
}

/// Diagnostics sink that keeps rows in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDiagnostics {
    records: Vec<DiagnosticRecord>,
    flushes: usize,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[DiagnosticRecord] {
        &self.records
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl DiagnosticsSink for MemoryDiagnostics {
    fn append(&mut self, record: &DiagnosticRecord) -> Result<(), DiagnosticsError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DiagnosticsError> {
        self.flushes += 1;
        Ok(())
    }
}
