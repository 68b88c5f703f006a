//! Backtest Driver
//!
//! Replays a merged, timestamp-ordered bar stream through the orchestrator
//! with a `PaperLedger` as account and execution venue. Each event marks the
//! ledger before the orchestrator sees it, so entries fill at the closes of
//! the bar that triggered them. Any open position is flattened at the end.

use serde::Serialize;

use super::orchestrator::{BarOutcome, EngineStatus, OrchestratorError, PairTradingOrchestrator};
use crate::adapters::paper_ledger::{LedgerSummary, PaperFill, PaperLedger};
use crate::domain::{BarEvent, Signal};
use crate::ports::DiagnosticsSink;
use crate::strategy::StrategyConfig;

/// How many times each signal was emitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalCounts {
    pub hold: u64,
    pub enter_long_spread: u64,
    pub enter_short_spread: u64,
    pub exit: u64,
}

impl SignalCounts {
    fn record(&mut self, signal: Signal) {
        match signal {
            Signal::Hold => self.hold += 1,
            Signal::EnterLongSpread => self.enter_long_spread += 1,
            Signal::EnterShortSpread => self.enter_short_spread += 1,
            Signal::Exit => self.exit += 1,
        }
    }

    pub fn entries(&self) -> u64 {
        self.enter_long_spread + self.enter_short_spread
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub events: usize,
    pub bars_processed: u64,
    pub bars_skipped: u64,
    pub events_ignored: u64,
    pub signals: SignalCounts,
    /// Legs flattened when the replay ended with an open position
    pub flattened_on_stop: usize,
    pub engine: EngineStatus,
    pub account: LedgerSummary,
    pub fills: Vec<PaperFill>,
}

/// Run one replay; hands the diagnostics sink back with the report
pub fn run_backtest<D: DiagnosticsSink>(
    config: StrategyConfig,
    starting_balance: f64,
    events: &[BarEvent],
    diagnostics: D,
) -> Result<(BacktestReport, D), OrchestratorError> {
    let mut orchestrator =
        PairTradingOrchestrator::new(config, PaperLedger::new(starting_balance), diagnostics)?;

    tracing::info!(events = events.len(), starting_balance, "Starting backtest replay");

    let mut signals = SignalCounts::default();
    let mut bars_skipped = 0u64;
    let mut events_ignored = 0u64;

    for event in events {
        if event.has_valid_close() {
            orchestrator
                .venue_mut()
                .mark(&event.instrument, event.close, event.timestamp);
        }
        match orchestrator.on_bar(event)? {
            BarOutcome::Processed(bar) => signals.record(bar.signal),
            BarOutcome::Skipped { .. } => bars_skipped += 1,
            BarOutcome::Ignored(_) => events_ignored += 1,
            BarOutcome::Pending => {}
        }
    }

    let flattened_on_stop = orchestrator.stop().len();
    let engine = orchestrator.status();
    let (ledger, diagnostics) = orchestrator.into_parts();
    let account = ledger.summary();

    tracing::info!(
        processed = engine.bars_processed,
        entries = signals.entries(),
        exits = signals.exit,
        equity = account.equity,
        "Backtest finished"
    );

    let report = BacktestReport {
        events: events.len(),
        bars_processed: engine.bars_processed,
        bars_skipped,
        events_ignored,
        signals,
        flattened_on_stop,
        engine,
        fills: ledger.fills().to_vec(),
        account,
    };
    Ok((report, diagnostics))
}
