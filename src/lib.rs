//! pair-arb - Cointegration Pair-Trading Engine Library
//!
//! Per-bar decision engine for a two-leg statistical arbitrage strategy:
//! a rolling Johansen hedge ratio, a z-scored spread, and a three-state
//! position machine that emits sized order intents.
//!
//! # Modules
//!
//! - `domain`: Value types (InstrumentId, RollingWindow, BetaVector, Signal, OrderIntent)
//! - `strategy`: Numerical core (Johansen estimator, SpreadTracker, SignalStateMachine, PositionSizer)
//! - `ports`: Trait abstractions (AccountPort, ExecutionPort, DiagnosticsSink)
//! - `application`: Orchestrator and backtest driver
//! - `adapters`: External implementations (CSV, paper ledger, CLI, synthetic data)
//! - `config`: Configuration loading and validation

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
