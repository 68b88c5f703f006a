//! Ledger Reports
//!
//! CSV exports of a finished paper ledger, written next to diagnostics.csv:
//! - `orders_fills_report.csv`: one row per fill
//! - `positions_report.csv`: one row per instrument ever traded
//! - `account_report.csv`: a single account summary row

use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::paper_ledger::{LedgerSummary, PaperFill};

pub const FILLS_REPORT: &str = "orders_fills_report.csv";
pub const POSITIONS_REPORT: &str = "positions_report.csv";
pub const ACCOUNT_REPORT: &str = "account_report.csv";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct FillRow<'a> {
    id: u64,
    timestamp: String,
    instrument: &'a str,
    side: String,
    quantity: f64,
    price: f64,
    notional: f64,
}

#[derive(Debug, Serialize)]
struct PositionRow<'a> {
    instrument: &'a str,
    open: bool,
    quantity: f64,
    avg_price: f64,
    realized_pnl: f64,
}

#[derive(Debug, Serialize)]
struct AccountRow {
    starting_balance: f64,
    cash: f64,
    equity: f64,
    return_pct: f64,
    realized_pnl: f64,
    unrealized_pnl: f64,
    fills: usize,
    volume: f64,
    max_drawdown_pct: f64,
}

/// Paths of the three files written by `write_reports`
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFiles {
    pub fills: PathBuf,
    pub positions: PathBuf,
    pub account: PathBuf,
}

/// Write all three reports into `dir`, creating it if needed
pub fn write_reports(
    dir: &Path,
    fills: &[PaperFill],
    account: &LedgerSummary,
) -> Result<ReportFiles, ReportError> {
    fs::create_dir_all(dir)?;
    let files = ReportFiles {
        fills: dir.join(FILLS_REPORT),
        positions: dir.join(POSITIONS_REPORT),
        account: dir.join(ACCOUNT_REPORT),
    };

    write_fills(File::create(&files.fills)?, fills)?;
    write_positions(File::create(&files.positions)?, account)?;
    write_account(File::create(&files.account)?, account)?;

    tracing::info!(dir = %dir.display(), fills = fills.len(), "Ledger reports written");
    Ok(files)
}

pub fn write_fills<W: Write>(writer: W, fills: &[PaperFill]) -> Result<(), ReportError> {
    let mut csv = headed(
        writer,
        &["id", "timestamp", "instrument", "side", "quantity", "price", "notional"],
    )?;
    for fill in fills {
        csv.serialize(FillRow {
            id: fill.id,
            timestamp: fill.timestamp.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
            instrument: fill.instrument.as_str(),
            side: fill.side.to_string(),
            quantity: fill.quantity.abs(),
            price: fill.price,
            notional: fill.notional(),
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_positions<W: Write>(writer: W, account: &LedgerSummary) -> Result<(), ReportError> {
    let mut csv = headed(
        writer,
        &["instrument", "open", "quantity", "avg_price", "realized_pnl"],
    )?;
    for (instrument, position) in &account.positions {
        csv.serialize(PositionRow {
            instrument,
            open: position.is_open(),
            quantity: position.quantity,
            avg_price: position.avg_price,
            realized_pnl: position.realized_pnl,
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_account<W: Write>(writer: W, account: &LedgerSummary) -> Result<(), ReportError> {
    let mut csv = headed(
        writer,
        &[
            "starting_balance",
            "cash",
            "equity",
            "return_pct",
            "realized_pnl",
            "unrealized_pnl",
            "fills",
            "volume",
            "max_drawdown_pct",
        ],
    )?;
    csv.serialize(AccountRow {
        starting_balance: account.starting_balance,
        cash: account.cash,
        equity: account.equity,
        return_pct: account.return_pct,
        realized_pnl: account.realized_pnl,
        unrealized_pnl: account.unrealized_pnl,
        fills: account.fills,
        volume: account.volume,
        max_drawdown_pct: account.max_drawdown_pct,
    })?;
    csv.flush()?;
    Ok(())
}

/// Header written up front so empty reports still carry their columns
fn headed<W: Write>(writer: W, header: &[&str]) -> Result<Writer<W>, ReportError> {
    let mut csv = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv.write_record(header)?;
    Ok(csv)
}
