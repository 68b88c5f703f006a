//! Pair Trading Orchestrator
//!
//! Wires the engine together for one pair. Per aligned bar:
//! closes -> price windows -> (periodic) hedge-ratio refresh -> spread and
//! z-score -> state machine -> sizing -> intents to the venue -> one
//! diagnostic row.
//!
//! The orchestrator is the only component that touches the account,
//! execution and diagnostics ports. It is single-threaded and owns all of
//! its mutable state; run one instance per pair.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::{
    BarEvent, BetaVector, InstrumentId, Leg, OrderIntent, PositionState, PriceWindow, Signal,
    WindowFill,
};
use crate::ports::{AccountPort, DiagnosticRecord, DiagnosticsSink, ExecutionPort};
use crate::strategy::{
    BetaRefresh, ConfigError, HedgeRatioEstimator, PositionSizer, SignalStateMachine,
    SizingError, SpreadSample, SpreadTracker, StrategyConfig,
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Sizing error: {0}")]
    Sizing(SizingError),
}

/// Why a bar event was dropped without processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IgnoreReason {
    UnknownInstrument,
    InvalidClose,
    /// At or before the last processed timestamp
    Stale,
}

/// What happened to one bar event
#[derive(Debug, Clone, PartialEq)]
pub enum BarOutcome {
    /// Waiting for the other leg's close for this period
    Pending,
    Ignored(IgnoreReason),
    /// Aligned, but the price windows are not full yet
    Skipped { timestamp: DateTime<Utc> },
    Processed(ProcessedBar),
}

/// A bar that went through the whole pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedBar {
    pub timestamp: DateTime<Utc>,
    pub signal: Signal,
    pub intents: Vec<OrderIntent>,
    pub sample: SpreadSample,
    pub betas: BetaVector,
    pub position: PositionState,
}

/// Status snapshot of the engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub position: PositionState,
    pub betas: BetaVector,
    pub hedge_ratio: Option<f64>,
    pub last_spread: Option<f64>,
    pub last_z_score: Option<f64>,
    pub bars_processed: u64,
    /// Processed bars whose full spread window had no dispersion
    pub degenerate_bars: u64,
    pub estimations_ok: u64,
    pub estimations_failed: u64,
    pub window_a: WindowFill,
    pub window_b: WindowFill,
    pub spread_window: WindowFill,
}

#[derive(Debug, Clone, Copy)]
struct PendingClose {
    timestamp: DateTime<Utc>,
    close: f64,
}

/// Main engine for one pair
pub struct PairTradingOrchestrator<V, D> {
    config: StrategyConfig,
    windows: [PriceWindow; 2],
    estimator: HedgeRatioEstimator,
    betas: BetaVector,
    spread: SpreadTracker,
    machine: SignalStateMachine,
    sizer: PositionSizer,
    pending: [Option<PendingClose>; 2],
    last_processed: Option<DateTime<Utc>>,
    full_bars: u64,
    bars_processed: u64,
    degenerate_bars: u64,
    last_sample: Option<SpreadSample>,
    venue: V,
    diagnostics: D,
}

impl<V, D> PairTradingOrchestrator<V, D>
where
    V: AccountPort + ExecutionPort,
    D: DiagnosticsSink,
{
    /// Create a new orchestrator; invalid configuration is rejected here
    pub fn new(config: StrategyConfig, venue: V, diagnostics: D) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let machine = SignalStateMachine::new(config.thresholds)?;
        let window = config.formation_window;

        Ok(Self {
            windows: [PriceWindow::new(window), PriceWindow::new(window)],
            estimator: HedgeRatioEstimator::new(window),
            betas: config.initial_betas(),
            spread: SpreadTracker::new(window),
            sizer: PositionSizer::new(&config.pair),
            machine,
            pending: [None, None],
            last_processed: None,
            full_bars: 0,
            bars_processed: 0,
            degenerate_bars: 0,
            last_sample: None,
            venue,
            diagnostics,
            config,
        })
    }

    /// Pre-fill both price windows from historical closes.
    ///
    /// The sequences are tail-aligned; only the last W pairs are kept.
    pub fn warm_up(&mut self, history_a: &[f64], history_b: &[f64]) {
        let n = history_a.len().min(history_b.len());
        let tail_a = &history_a[history_a.len() - n..];
        let tail_b = &history_b[history_b.len() - n..];

        let mut pushed = 0usize;
        for (&a, &b) in tail_a.iter().zip(tail_b) {
            if !(a.is_finite() && a > 0.0 && b.is_finite() && b > 0.0) {
                continue;
            }
            self.windows[0].push(a);
            self.windows[1].push(b);
            pushed += 1;
        }

        tracing::info!(
            pushed,
            window_a = self.windows[0].len(),
            window_b = self.windows[1].len(),
            "Price windows pre-filled from history"
        );
    }

    /// Handle one new-bar event
    pub fn on_bar(&mut self, event: &BarEvent) -> Result<BarOutcome, OrchestratorError> {
        let Some(leg) = self.leg_of(&event.instrument) else {
            tracing::debug!(instrument = %event.instrument, "Bar for unknown instrument ignored");
            return Ok(BarOutcome::Ignored(IgnoreReason::UnknownInstrument));
        };
        if !event.has_valid_close() {
            tracing::warn!(instrument = %event.instrument, close = event.close, "Invalid close ignored");
            return Ok(BarOutcome::Ignored(IgnoreReason::InvalidClose));
        }
        if self.last_processed.is_some_and(|last| event.timestamp <= last) {
            tracing::warn!(instrument = %event.instrument, timestamp = %event.timestamp, "Stale bar ignored");
            return Ok(BarOutcome::Ignored(IgnoreReason::Stale));
        }

        if let Some(previous) = self.pending[leg.index()] {
            if previous.timestamp != event.timestamp {
                tracing::warn!(
                    instrument = %event.instrument,
                    dropped = %previous.timestamp,
                    "Unmatched bar replaced by a newer one"
                );
            }
        }
        self.pending[leg.index()] = Some(PendingClose {
            timestamp: event.timestamp,
            close: event.close,
        });

        let (Some(mine), Some(theirs)) = (self.pending[leg.index()], self.pending[leg.other().index()]) else {
            return Ok(BarOutcome::Pending);
        };
        if mine.timestamp != theirs.timestamp {
            // The older close can never be matched now
            let (stale, dropped) = if theirs.timestamp < mine.timestamp {
                (leg.other(), theirs.timestamp)
            } else {
                (leg, mine.timestamp)
            };
            tracing::warn!(leg = ?stale, dropped = %dropped, "Discarding unmatched bar");
            self.pending[stale.index()] = None;
            return Ok(BarOutcome::Pending);
        }

        let (a, b) = match leg {
            Leg::A => (mine, theirs),
            Leg::B => (theirs, mine),
        };
        self.pending = [None, None];
        self.last_processed = Some(event.timestamp);
        self.process_aligned(event.timestamp, a.close, b.close)
    }

    fn process_aligned(
        &mut self,
        timestamp: DateTime<Utc>,
        close_a: f64,
        close_b: f64,
    ) -> Result<BarOutcome, OrchestratorError> {
        self.windows[0].push(close_a);
        self.windows[1].push(close_b);

        if !(self.windows[0].is_full() && self.windows[1].is_full()) {
            tracing::debug!(
                %timestamp,
                have = self.windows[0].len().min(self.windows[1].len()),
                need = self.config.formation_window,
                "Not enough bars yet"
            );
            return Ok(BarOutcome::Skipped { timestamp });
        }

        self.full_bars += 1;
        if (self.full_bars - 1) % self.config.reestimate_every as u64 == 0 {
            self.refresh_betas();
        }

        let closes = HashMap::from([
            (self.config.pair.leg_a.clone(), close_a),
            (self.config.pair.leg_b.clone(), close_b),
        ]);
        let Some(sample) = self.spread.update(&closes, &self.betas) else {
            return Ok(BarOutcome::Skipped { timestamp });
        };
        self.last_sample = Some(sample);
        self.bars_processed += 1;
        if sample.is_degenerate() {
            self.degenerate_bars += 1;
        }

        let (signal, intents) = self.decide_and_size(sample, &closes)?;
        for intent in &intents {
            if let Err(e) = self.venue.submit(intent) {
                tracing::error!(intent = %intent, error = %e, "Order submission failed");
            }
        }

        let record = DiagnosticRecord {
            timestamp,
            price_a: close_a,
            price_b: close_b,
            beta_a: self.betas.for_leg(Leg::A),
            beta_b: self.betas.for_leg(Leg::B),
            spread: sample.spread,
            z_score: sample.z_score,
        };
        if let Err(e) = self.diagnostics.append(&record) {
            tracing::error!(error = %e, "Failed to append diagnostic record");
        }

        match signal {
            Signal::Hold => tracing::debug!(
                %timestamp,
                spread = sample.spread,
                z_score = ?sample.z_score,
                "HOLD"
            ),
            _ => tracing::info!(
                %timestamp,
                %signal,
                spread = sample.spread,
                z_score = ?sample.z_score,
                orders = intents.len(),
                "Signal"
            ),
        }

        Ok(BarOutcome::Processed(ProcessedBar {
            timestamp,
            signal,
            intents,
            sample,
            betas: self.betas.clone(),
            position: self.machine.state(),
        }))
    }

    fn refresh_betas(&mut self) {
        let a = self.windows[0].snapshot();
        let b = self.windows[1].snapshot();
        if let BetaRefresh::Updated(betas) = self.estimator.refresh(&a, &b, &self.betas) {
            self.betas = betas;
        }
    }

    /// Run the state machine and size the result. Any recoverable problem
    /// with an entry resolves to HOLD without a transition.
    fn decide_and_size(
        &mut self,
        sample: SpreadSample,
        prices: &HashMap<InstrumentId, f64>,
    ) -> Result<(Signal, Vec<OrderIntent>), OrchestratorError> {
        let decision = self.machine.peek(sample.z_score);

        let capital_to_risk = if decision.signal.is_entry() {
            match self.venue.equity() {
                Ok(equity) if equity.is_finite() && equity > 0.0 => {
                    self.config.capital_to_risk_ratio * equity
                }
                Ok(equity) => {
                    tracing::warn!(equity, signal = %decision.signal, "Non-positive equity, holding");
                    return Ok((Signal::Hold, Vec::new()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, signal = %decision.signal, "Equity lookup failed, holding");
                    return Ok((Signal::Hold, Vec::new()));
                }
            }
        } else {
            0.0
        };

        match self.sizer.size(decision.signal, &self.betas, prices, capital_to_risk) {
            Ok(intents) => {
                self.machine.commit(decision);
                Ok((decision.signal, intents))
            }
            Err(e) if e.is_fatal() => Err(OrchestratorError::Sizing(e)),
            Err(e) => {
                tracing::warn!(error = %e, signal = %decision.signal, "Sizing failed, holding");
                Ok((Signal::Hold, Vec::new()))
            }
        }
    }

    /// Flatten any open position and flush diagnostics.
    ///
    /// Returns the flattening intents that were submitted.
    pub fn stop(&mut self) -> Vec<OrderIntent> {
        let mut intents = Vec::new();
        if !self.machine.state().is_flat() {
            intents = self
                .sizer
                .legs()
                .iter()
                .cloned()
                .map(OrderIntent::flatten)
                .collect();
            for intent in &intents {
                if let Err(e) = self.venue.submit(intent) {
                    tracing::error!(intent = %intent, error = %e, "Flatten on stop failed");
                }
            }
            tracing::info!(from = %self.machine.state(), "Position closed on stop");
            self.machine.force_flat();
        }
        if let Err(e) = self.diagnostics.flush() {
            tracing::error!(error = %e, "Failed to flush diagnostics");
        }
        intents
    }

    /// Explicit restart: empty windows and spread series, FLAT, initial betas
    pub fn reset(&mut self) {
        for window in &mut self.windows {
            window.clear();
        }
        self.spread.reset();
        self.estimator.reset();
        self.machine.force_flat();
        self.betas = self.config.initial_betas();
        self.pending = [None, None];
        self.last_processed = None;
        self.full_bars = 0;
        self.bars_processed = 0;
        self.degenerate_bars = 0;
        self.last_sample = None;
        tracing::info!("Engine reset");
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            position: self.machine.state(),
            betas: self.betas.clone(),
            hedge_ratio: self.betas.hedge_ratio(),
            last_spread: self.spread.latest(),
            last_z_score: self.last_sample.and_then(|s| s.z_score),
            bars_processed: self.bars_processed,
            degenerate_bars: self.degenerate_bars,
            estimations_ok: self.estimator.successes(),
            estimations_failed: self.estimator.failures(),
            window_a: self.windows[0].fill(),
            window_b: self.windows[1].fill(),
            spread_window: self.spread.series().fill(),
        }
    }

    fn leg_of(&self, instrument: &InstrumentId) -> Option<Leg> {
        if *instrument == self.config.pair.leg_a {
            Some(Leg::A)
        } else if *instrument == self.config.pair.leg_b {
            Some(Leg::B)
        } else {
            None
        }
    }

    pub fn position(&self) -> PositionState {
        self.machine.state()
    }

    pub fn betas(&self) -> &BetaVector {
        &self.betas
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn venue_mut(&mut self) -> &mut V {
        &mut self.venue
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Tear down and hand back the ports
    pub fn into_parts(self) -> (V, D) {
        (self.venue, self.diagnostics)
    }
}
