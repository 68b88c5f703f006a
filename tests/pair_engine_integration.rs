//! Pair Engine Integration Tests
//!
//! Integration tests that verify the engine components work together:
//! 1. Synthetic pair -> Johansen estimator -> recovered hedge ratio
//! 2. Bar stream -> PairTradingOrchestrator -> intents and diagnostics
//! 3. CSV bar files -> backtest driver -> paper ledger and diagnostics file
//!
//! All tests are deterministic (seeded data, no network).

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::io::Cursor;

use pair_arb::adapters::csv_bars::{merge_by_timestamp, write_bars, CsvBarSource};
use pair_arb::adapters::{
    generate_pair, write_reports, CsvDiagnosticsWriter, PaperLedger, SyntheticPairConfig,
};
use pair_arb::application::{run_backtest, BarOutcome, PairTradingOrchestrator};
use pair_arb::domain::{
    BarEvent, BetaVector, InstrumentId, OrderIntent, PositionState, ReplayPeriod, Signal,
};
use pair_arb::ports::{AccountPort, MemoryDiagnostics, RecordingVenue};
use pair_arb::strategy::{
    johansen, PairConfig, PositionSizer, SignalStateMachine, SignalThresholds, StrategyConfig,
};

// ============================================================================
// Test Fixtures
// ============================================================================

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn synthetic(bars: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let pair = generate_pair(&SyntheticPairConfig {
        bars,
        ratio: 2.0,
        noise: 1.0,
        seed,
        ..Default::default()
    });
    (pair.leg_a, pair.leg_b)
}

fn event_stream(leg_a: &[f64], leg_b: &[f64]) -> Vec<BarEvent> {
    leg_a
        .iter()
        .zip(leg_b)
        .enumerate()
        .flat_map(|(i, (a, b))| {
            let ts = start() + Duration::minutes(i as i64);
            [BarEvent::new("BTC", *a, ts), BarEvent::new("ETH", *b, ts)]
        })
        .collect()
}

fn strategy(window: usize) -> StrategyConfig {
    StrategyConfig::new(PairConfig::new("BTC", "ETH")).with_formation_window(window)
}

// ============================================================================
// Estimation
// ============================================================================

#[test]
fn test_johansen_recovers_ratio_across_seeds() {
    for seed in [1, 2, 3] {
        let (a, b) = synthetic(1_000, seed);
        let betas = johansen(&a, &b).unwrap().normalized_betas().unwrap();
        assert_eq!(betas[1], -1.0);
        assert!((betas[0] - 2.0).abs() < 0.05, "seed {} beta_a {}", seed, betas[0]);
    }
}

// ============================================================================
// Orchestrator Flow
// ============================================================================

#[test]
fn test_orchestrator_full_pipeline() {
    let (a, b) = synthetic(800, 9);
    let mut orch = PairTradingOrchestrator::new(
        strategy(100),
        RecordingVenue::with_equity(250_000.0),
        MemoryDiagnostics::new(),
    )
    .unwrap();

    let mut processed = Vec::new();
    for event in event_stream(&a, &b) {
        if let BarOutcome::Processed(bar) = orch.on_bar(&event).unwrap() {
            processed.push(bar);
        }
    }

    assert_eq!(processed.len(), 800 - 99);
    assert_eq!(orch.diagnostics().records().len(), processed.len());

    // The first W-1 processed bars fill the spread window: no z-score yet
    assert!(processed[..99].iter().all(|bar| bar.sample.z_score.is_none()));
    assert!(processed[99..].iter().all(|bar| bar.sample.z_score.is_some()));

    let status = orch.status();
    assert!((status.hedge_ratio.unwrap() - 2.0).abs() < 0.3);
    assert_eq!(status.estimations_ok + status.estimations_failed, processed.len() as u64);

    // Entries carry one market intent per leg with opposite signs
    for bar in processed.iter().filter(|bar| bar.signal.is_entry()) {
        assert_eq!(bar.intents.len(), 2);
        let qa = bar.intents[0].signed_quantity().unwrap();
        let qb = bar.intents[1].signed_quantity().unwrap();
        assert!(qa * qb < 0.0);
        match bar.signal {
            Signal::EnterLongSpread => assert!(qa > 0.0),
            Signal::EnterShortSpread => assert!(qa < 0.0),
            _ => unreachable!(),
        }
    }
    // Exits flatten both legs
    for bar in processed.iter().filter(|bar| bar.signal == Signal::Exit) {
        assert_eq!(
            bar.intents,
            vec![
                OrderIntent::flatten("BTC".into()),
                OrderIntent::flatten("ETH".into())
            ]
        );
    }
}

#[test]
fn test_diagnostic_rows_match_bars() {
    let (a, b) = synthetic(60, 4);
    let mut orch = PairTradingOrchestrator::new(
        strategy(20),
        RecordingVenue::with_equity(10_000.0),
        MemoryDiagnostics::new(),
    )
    .unwrap();
    for event in event_stream(&a, &b) {
        orch.on_bar(&event).unwrap();
    }

    let records = orch.diagnostics().records();
    assert_eq!(records.len(), 41);
    let last = records.last().unwrap();
    assert_eq!(last.price_a, *a.last().unwrap());
    assert_eq!(last.price_b, *b.last().unwrap());
    let spread = last.beta_a * last.price_a + last.beta_b * last.price_b;
    assert!((last.spread - spread).abs() < 1e-9);
}

#[test]
fn test_paper_ledger_as_venue() {
    let (a, b) = synthetic(500, 12);
    let mut orch =
        PairTradingOrchestrator::new(strategy(80), PaperLedger::new(100_000.0), MemoryDiagnostics::new())
            .unwrap();

    for event in event_stream(&a, &b) {
        orch.venue_mut().mark(&event.instrument, event.close, event.timestamp);
        orch.on_bar(&event).unwrap();
    }
    let open_before_stop = !orch.position().is_flat();
    let flattened = orch.stop();
    assert_eq!(flattened.len(), if open_before_stop { 2 } else { 0 });

    let ledger = orch.venue();
    assert_eq!(ledger.quantity(&"BTC".into()), 0.0);
    assert_eq!(ledger.quantity(&"ETH".into()), 0.0);
    // Flat book: equity is all cash
    assert!((ledger.equity().unwrap() - ledger.cash()).abs() < 1e-6);
}

// ============================================================================
// Sizing And State Machine Scenarios
// ============================================================================

#[test]
fn test_documented_sizing_example() {
    let sizer = PositionSizer::new(&PairConfig::new("A", "B"));
    let betas = BetaVector::new("A".into(), 1.0, "B".into(), -2.0);
    let prices: HashMap<InstrumentId, f64> = HashMap::from([("A".into(), 100.0), ("B".into(), 50.0)]);

    let intents = sizer
        .size(Signal::EnterLongSpread, &betas, &prices, 1_000.0)
        .unwrap();
    assert_eq!(intents[0].signed_quantity(), Some(5.0));
    assert_eq!(intents[1].signed_quantity(), Some(-20.0));
}

#[test]
fn test_documented_signal_sequence() {
    let mut machine = SignalStateMachine::new(SignalThresholds::new(2.0, 0.5)).unwrap();
    let signals: Vec<Signal> = [0.1, 2.3, 1.9, 0.3]
        .into_iter()
        .map(|z| machine.on_zscore(Some(z)))
        .collect();
    assert_eq!(
        signals,
        vec![Signal::Hold, Signal::EnterShortSpread, Signal::Hold, Signal::Exit]
    );
    assert_eq!(machine.state(), PositionState::Flat);
}

// ============================================================================
// Backtest Over CSV Files
// ============================================================================

#[test]
fn test_backtest_from_csv_files() {
    let (a, b) = synthetic(300, 5);
    let to_csv = |closes: &[f64]| {
        let mut buf = Vec::new();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| (start() + Duration::hours(i as i64), *c));
        write_bars(&mut buf, bars).unwrap();
        buf
    };

    let leg_a = CsvBarSource::from_reader("BTC".into(), Cursor::new(to_csv(&a))).unwrap();
    // Drop one ETH bar: its BTC partner can never be matched
    let mut b_rows = to_csv(&b);
    let text = String::from_utf8(b_rows.clone()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    let without_one: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 150)
        .map(|(_, l)| *l)
        .collect();
    b_rows = without_one.join("\n").into_bytes();
    let leg_b = CsvBarSource::from_reader("ETH".into(), Cursor::new(b_rows)).unwrap();
    assert_eq!(leg_b.len(), 299);

    let events = merge_by_timestamp(&leg_a, &leg_b);
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("diagnostics.csv");
    let writer = CsvDiagnosticsWriter::create(&path, &"BTC".into(), &"ETH".into()).unwrap();

    let (report, writer) = run_backtest(strategy(40), 50_000.0, &events, writer).unwrap();
    let rows = writer.rows();
    drop(writer);

    // 299 aligned bars, 39 of them before the windows fill
    assert_eq!(report.bars_skipped, 39);
    assert_eq!(report.bars_processed, 260);
    assert_eq!(rows, 260);

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "timestamp,price_BTC,price_ETH,beta_BTC,beta_ETH,spread,z_score"
    );
    assert_eq!(lines.count(), 260);
    assert!(report.engine.position.is_flat());
}

#[test]
fn test_replay_period_and_ledger_reports() {
    let (a, b) = synthetic(400, 8);
    let events = event_stream(&a, &b);

    // Minutes 50..=349 inclusive: 300 aligned bars
    let period = ReplayPeriod::new(
        Some(start() + Duration::minutes(50)),
        Some(start() + Duration::minutes(349)),
    )
    .unwrap();
    let events = period.filter(events);
    assert_eq!(events.len(), 600);
    assert_eq!(events.first().unwrap().timestamp, start() + Duration::minutes(50));

    let (report, _) =
        run_backtest(strategy(30), 100_000.0, &events, MemoryDiagnostics::new()).unwrap();
    assert_eq!(report.bars_skipped, 29);
    assert_eq!(report.bars_processed, 271);

    let dir = tempfile::TempDir::new().unwrap();
    let files = write_reports(dir.path(), &report.fills, &report.account).unwrap();

    let fills = std::fs::read_to_string(&files.fills).unwrap();
    assert_eq!(fills.lines().count(), report.fills.len() + 1);
    assert!(fills.starts_with("id,timestamp,instrument,side,quantity,price,notional\n"));

    let positions = std::fs::read_to_string(&files.positions).unwrap();
    assert_eq!(positions.lines().count(), report.account.positions.len() + 1);
    // Flattened on stop: nothing left open
    assert!(positions.lines().skip(1).all(|row| row.split(',').nth(1) == Some("false")));

    let account = std::fs::read_to_string(&files.account).unwrap();
    assert_eq!(account.lines().count(), 2);
}
