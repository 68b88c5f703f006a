pub mod orchestrator;
pub mod backtest;

pub use orchestrator::{
    BarOutcome, EngineStatus, IgnoreReason, OrchestratorError, PairTradingOrchestrator,
    ProcessedBar,
};
pub use backtest::{run_backtest, BacktestReport, SignalCounts};
