//! Diagnostics port
//!
//! One append-only row per processed bar for offline analysis:
//! leg prices, leg betas, spread, z-score.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-bar diagnostic row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub timestamp: DateTime<Utc>,
    pub price_a: f64,
    pub price_b: f64,
    pub beta_a: f64,
    pub beta_b: f64,
    pub spread: f64,
    /// Empty before the window fills or when the spread is flat
    pub z_score: Option<f64>,
}

impl DiagnosticRecord {
    pub fn csv_header(leg_a: &str, leg_b: &str) -> String {
        format!(
            "timestamp,price_{a},price_{b},beta_{a},beta_{b},spread,z_score",
            a = leg_a,
            b = leg_b
        )
    }

    /// Write the row as CSV directly to a writer
    pub fn write_csv_to<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write!(
            writer,
            "{},{},{},{},{},{},",
            self.timestamp.to_rfc3339(),
            self.price_a,
            self.price_b,
            self.beta_a,
            self.beta_b,
            self.spread,
        )?;
        if let Some(z) = self.z_score {
            write!(writer, "{}", z)?;
        }
        Ok(())
    }
}

/// Append-only destination for diagnostic rows
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticsSink {
    fn append(&mut self, record: &DiagnosticRecord) -> Result<(), DiagnosticsError>;

    fn flush(&mut self) -> Result<(), DiagnosticsError> {
        Ok(())
    }
}
