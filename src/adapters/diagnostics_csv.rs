//! CSV Diagnostics Writer
//!
//! Append-only diagnostics file: one header line, then one row per
//! processed bar in the `DiagnosticRecord` CSV layout.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::InstrumentId;
use crate::ports::{DiagnosticRecord, DiagnosticsError, DiagnosticsSink};

pub struct CsvDiagnosticsWriter<W: Write = BufWriter<File>> {
    writer: W,
    rows: usize,
}

impl CsvDiagnosticsWriter {
    /// Create (or truncate) `path` and write the header.
    /// Missing parent directories are created.
    pub fn create(
        path: &Path,
        leg_a: &InstrumentId,
        leg_b: &InstrumentId,
    ) -> Result<Self, DiagnosticsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        tracing::debug!(path = %path.display(), "Diagnostics file created");
        Self::new(BufWriter::new(file), leg_a, leg_b)
    }
}

impl<W: Write> CsvDiagnosticsWriter<W> {
    pub fn new(mut writer: W, leg_a: &InstrumentId, leg_b: &InstrumentId) -> Result<Self, DiagnosticsError> {
        writeln!(writer, "{}", DiagnosticRecord::csv_header(leg_a.as_str(), leg_b.as_str()))?;
        Ok(Self { writer, rows: 0 })
    }

    /// Data rows written so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DiagnosticsSink for CsvDiagnosticsWriter<W> {
    fn append(&mut self, record: &DiagnosticRecord) -> Result<(), DiagnosticsError> {
        record.write_csv_to(&mut self.writer)?;
        writeln!(self.writer)?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DiagnosticsError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn record(z_score: Option<f64>) -> DiagnosticRecord {
        DiagnosticRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            price_a: 10.0,
            price_b: 20.0,
            beta_a: 1.5,
            beta_b: -1.0,
            spread: -5.0,
            z_score,
        }
    }

    #[test]
    fn test_writes_header_and_rows() {
        let mut writer =
            CsvDiagnosticsWriter::new(Vec::new(), &"BTC".into(), &"ETH".into()).unwrap();
        writer.append(&record(None)).unwrap();
        writer.append(&record(Some(0.5))).unwrap();
        assert_eq!(writer.rows(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,price_BTC,price_ETH,beta_BTC,beta_ETH,spread,z_score");
        assert_eq!(lines[1], "2024-01-02T00:00:00+00:00,10,20,1.5,-1,-5,");
        assert_eq!(lines[2], "2024-01-02T00:00:00+00:00,10,20,1.5,-1,-5,0.5");
    }

    #[test]
    fn test_create_makes_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/report/diagnostics.csv");

        let mut writer = CsvDiagnosticsWriter::create(&path, &"A".into(), &"B".into()).unwrap();
        writer.append(&record(Some(-2.0))).unwrap();
        writer.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with("-2\n"));
    }
}
