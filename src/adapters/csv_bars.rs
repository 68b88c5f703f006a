//! CSV Bar Source
//!
//! Loads OHLC(V) bar files (`timestamp,open,high,low,close[,volume]`) and
//! turns them into close-price `BarEvent`s for the orchestrator. Only the
//! timestamp and close columns are required; column order follows the header.
//!
//! Accepted timestamps: RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, or
//! integer Unix seconds. Rows with an unparseable timestamp or a close that
//! is missing, non-finite or non-positive are dropped and counted.

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

use crate::domain::{parse_timestamp, BarEvent, InstrumentId};

const TIMESTAMP_COLUMNS: [&str; 4] = ["timestamp", "time", "date", "datetime"];

#[derive(Debug, Error)]
pub enum BarSourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing header")]
    MissingHeader,
    #[error("Missing column: {0}")]
    MissingColumn(&'static str),
}

/// One parsed row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsvBar {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Row as read from the file, before validation
#[derive(Debug, Deserialize)]
struct RawBar {
    timestamp: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
}

impl RawBar {
    fn into_bar(self) -> Option<CsvBar> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        let close = self.close.filter(|c| c.is_finite() && *c > 0.0)?;
        Some(CsvBar {
            timestamp,
            close,
            volume: self.volume,
        })
    }
}

/// Bars for a single instrument, sorted by timestamp
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    instrument: InstrumentId,
    bars: Vec<CsvBar>,
    dropped: usize,
}

impl CsvBarSource {
    /// Load bars for `instrument` from a CSV file
    pub fn load(instrument: InstrumentId, path: &Path) -> Result<Self, BarSourceError> {
        let file = File::open(path)?;
        let source = Self::from_reader(instrument, file)?;
        tracing::info!(
            path = %path.display(),
            instrument = %source.instrument,
            bars = source.bars.len(),
            dropped = source.dropped,
            "Loaded bar file"
        );
        Ok(source)
    }

    pub fn from_reader<R: Read>(instrument: InstrumentId, reader: R) -> Result<Self, BarSourceError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = normalize_headers(reader.headers()?)?;

        let mut bars = Vec::new();
        let mut dropped = 0usize;
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            match record
                .deserialize::<RawBar>(Some(&headers))
                .ok()
                .and_then(RawBar::into_bar)
            {
                Some(bar) => bars.push(bar),
                None => {
                    tracing::debug!(line, "Dropping unusable bar row");
                    dropped += 1;
                }
            }
        }

        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);

        Ok(Self {
            instrument,
            bars,
            dropped,
        })
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn bars(&self) -> &[CsvBar] {
        &self.bars
    }

    /// Rows rejected while parsing
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn events(&self) -> impl Iterator<Item = BarEvent> + '_ {
        self.bars
            .iter()
            .map(|b| BarEvent::new(self.instrument.clone(), b.close, b.timestamp))
    }
}

/// Interleave two sources into one timestamp-ordered event stream.
/// On equal timestamps the first source's bar comes first.
pub fn merge_by_timestamp(first: &CsvBarSource, second: &CsvBarSource) -> Vec<BarEvent> {
    let mut events: Vec<BarEvent> = first.events().chain(second.events()).collect();
    // Stable sort keeps `first` ahead on ties
    events.sort_by_key(|e| e.timestamp);
    events
}

/// Write a close series as an OHLC CSV (open = high = low = close)
pub fn write_bars<W: Write>(
    writer: &mut W,
    bars: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
) -> std::io::Result<()> {
    writeln!(writer, "timestamp,open,high,low,close")?;
    for (timestamp, close) in bars {
        writeln!(
            writer,
            "{},{c},{c},{c},{c}",
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            c = close
        )?;
    }
    Ok(())
}

/// Lower-case the header and map the first timestamp-like column onto
/// `timestamp`, so rows deserialize into `RawBar` whatever the export called it
fn normalize_headers(raw: &StringRecord) -> Result<StringRecord, BarSourceError> {
    let mut columns: Vec<String> = raw
        .iter()
        .map(|c| c.trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect();
    if columns.iter().all(String::is_empty) {
        return Err(BarSourceError::MissingHeader);
    }

    let ts_col = columns
        .iter()
        .position(|c| TIMESTAMP_COLUMNS.contains(&c.as_str()))
        .ok_or(BarSourceError::MissingColumn("timestamp"))?;
    if !columns.iter().any(|c| c == "close") {
        return Err(BarSourceError::MissingColumn("close"));
    }
    for (i, column) in columns.iter_mut().enumerate() {
        if i == ts_col {
            *column = "timestamp".to_string();
        } else if TIMESTAMP_COLUMNS.contains(&column.as_str()) {
            // A second time column stays out of the way of `timestamp`
            column.insert(0, '_');
        }
    }
    Ok(StringRecord::from(columns))
}
