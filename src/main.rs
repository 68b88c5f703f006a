//! pair-arb - Cointegration Pair-Trading Engine
//!
//! Backtests a two-leg Johansen spread strategy over bar files.

use anyhow::{bail, Context, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use pair_arb::adapters::cli::{BacktestCmd, CliApp, Command, OutputFormat, SynthCmd, ValidateCmd};
use pair_arb::adapters::csv_bars::{merge_by_timestamp, write_bars, CsvBarSource};
use pair_arb::adapters::{
    generate_pair, write_reports, CsvDiagnosticsWriter, ReportFiles, SyntheticPairConfig,
};
use pair_arb::application::{run_backtest, BacktestReport};
use pair_arb::config::{load_config, Config};
use pair_arb::domain::{parse_timestamp, ReplayPeriod};
use pair_arb::ports::DiagnosticsSink;
use pair_arb::strategy::StrategyConfig;

fn main() -> Result<()> {
    // Load .env file if it exists (PAIR_ARB_REPORT_DIR, RUST_LOG)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config_level = app
        .command
        .config_path()
        .and_then(|p| peek_log_level(p));
    init_logging(app.verbose, app.debug, config_level.as_deref())?;

    match app.command {
        Command::Backtest(cmd) => backtest_command(cmd),
        Command::Synth(cmd) => synth_command(cmd),
        Command::Validate(cmd) => validate_command(cmd),
    }
}

/// Flags win, then RUST_LOG, then the config file, then warn
fn init_logging(verbose: bool, debug: bool, config_level: Option<&str>) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config_level.unwrap_or("warn")))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

/// Best-effort read of `[logging] level` before logging exists
fn peek_log_level(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let config: Config = toml::from_str(&content).ok()?;
    Some(config.logging.level)
}

fn backtest_command(cmd: BacktestCmd) -> Result<()> {
    let config = load_config(&cmd.config)
        .with_context(|| format!("Failed to load configuration from {}", cmd.config.display()))?;
    let strategy = StrategyConfig::from(&config);

    let leg_a_path = cmd
        .leg_a
        .or_else(|| config.backtest.leg_a_path())
        .context("No bar file for leg A (use --leg-a or [backtest] leg_a_csv)")?;
    let leg_b_path = cmd
        .leg_b
        .or_else(|| config.backtest.leg_b_path())
        .context("No bar file for leg B (use --leg-b or [backtest] leg_b_csv)")?;

    let leg_a = CsvBarSource::load(strategy.pair.leg_a.clone(), &leg_a_path)
        .with_context(|| format!("Failed to load bars from {}", leg_a_path.display()))?;
    let leg_b = CsvBarSource::load(strategy.pair.leg_b.clone(), &leg_b_path)
        .with_context(|| format!("Failed to load bars from {}", leg_b_path.display()))?;
    if leg_a.is_empty() || leg_b.is_empty() {
        bail!(
            "Bar files contain no usable rows ({}: {}, {}: {})",
            leg_a.instrument(),
            leg_a.len(),
            leg_b.instrument(),
            leg_b.len()
        );
    }

    let configured = config
        .backtest
        .replay_period()
        .context("Invalid replay period in configuration")?;
    let start = match cmd.start.as_deref() {
        Some(raw) => Some(parse_timestamp(raw).with_context(|| format!("Invalid --start time: {}", raw))?),
        None => configured.start,
    };
    let end = match cmd.end.as_deref() {
        Some(raw) => Some(parse_timestamp(raw).with_context(|| format!("Invalid --end time: {}", raw))?),
        None => configured.end,
    };
    let period = ReplayPeriod::new(start, end)?;

    let merged = merge_by_timestamp(&leg_a, &leg_b);
    let available = merged.len();
    let events = period.filter(merged);
    if events.is_empty() {
        bail!("No bars inside the replay period ({} available)", available);
    }
    if events.len() < available {
        tracing::info!(
            start = ?period.start,
            end = ?period.end,
            kept = events.len(),
            outside = available - events.len(),
            "Replay period applied"
        );
    }

    let report_dir = cmd
        .report_dir
        .unwrap_or_else(|| config.backtest.report_path());
    let diagnostics_path = report_dir.join("diagnostics.csv");
    let diagnostics =
        CsvDiagnosticsWriter::create(&diagnostics_path, &strategy.pair.leg_a, &strategy.pair.leg_b)
            .with_context(|| format!("Failed to create {}", diagnostics_path.display()))?;

    let (report, mut diagnostics) =
        run_backtest(strategy, config.backtest.starting_balance, &events, diagnostics)
            .context("Backtest aborted")?;
    diagnostics
        .flush()
        .context("Failed to flush diagnostics")?;
    let reports = write_reports(&report_dir, &report.fills, &report.account)
        .with_context(|| format!("Failed to write reports to {}", report_dir.display()))?;

    match cmd.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        }
        OutputFormat::Text => {
            print_report(&report, &config, &period, cmd.fills);
            print_files(&diagnostics_path, &reports);
        }
    }
    Ok(())
}

fn print_report(report: &BacktestReport, config: &Config, period: &ReplayPeriod, show_fills: bool) {
    let account = &report.account;
    let engine = &report.engine;
    let bound = |ts: Option<chrono::DateTime<Utc>>| {
        ts.map(|ts| ts.to_rfc3339()).unwrap_or_else(|| "open".to_string())
    };

    println!("Backtest {} / {}", config.pair.leg_a, config.pair.leg_b);
    if !period.is_unbounded() {
        println!("  Period:        {} .. {}", bound(period.start), bound(period.end));
    }
    println!("  Events:        {}", report.events);
    println!("  Processed:     {}", report.bars_processed);
    println!("  Warm-up:       {}", report.bars_skipped);
    println!("  Ignored:       {}", report.events_ignored);
    println!();
    println!("Signals");
    println!("  Long spread:   {}", report.signals.enter_long_spread);
    println!("  Short spread:  {}", report.signals.enter_short_spread);
    println!("  Exit:          {}", report.signals.exit);
    println!("  Hold:          {}", report.signals.hold);
    println!("  Flat spread:   {} bars", engine.degenerate_bars);
    if report.flattened_on_stop > 0 {
        println!("  Flattened at end: {} legs", report.flattened_on_stop);
    }
    println!();
    println!("Hedge ratio");
    match engine.hedge_ratio {
        Some(ratio) => println!("  Latest:        {:.6}", ratio),
        None => println!("  Latest:        n/a"),
    }
    println!(
        "  Estimations:   {} ok, {} kept previous",
        engine.estimations_ok, engine.estimations_failed
    );
    println!();
    println!("Account");
    println!("  Start:         {:.2}", account.starting_balance);
    println!("  Equity:        {:.2}", account.equity);
    println!("  Cash:          {:.2}", account.cash);
    println!("  Return:        {:.2}%", account.return_pct);
    println!("  Realized PnL:  {:.2}", account.realized_pnl);
    println!("  Max drawdown:  {:.2}%", account.max_drawdown_pct);
    println!("  Fills:         {} ({:.2} traded)", account.fills, account.volume);

    if !account.positions.is_empty() {
        println!();
        println!("Positions");
        for (instrument, position) in &account.positions {
            println!(
                "  {:<12} qty {:>14.6}  realized {:>12.2}",
                instrument, position.quantity, position.realized_pnl
            );
        }
    }

    if show_fills && !report.fills.is_empty() {
        println!();
        println!("Fills");
        for fill in &report.fills {
            let when = fill
                .timestamp
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  #{:<5} {} {} {:.6} {} @ {:.4}",
                fill.id,
                when,
                fill.side,
                fill.quantity.abs(),
                fill.instrument,
                fill.price
            );
        }
    }
}

fn print_files(diagnostics: &Path, reports: &ReportFiles) {
    println!();
    println!("Reports");
    println!("  Diagnostics:   {}", diagnostics.display());
    println!("  Fills:         {}", reports.fills.display());
    println!("  Positions:     {}", reports.positions.display());
    println!("  Account:       {}", reports.account.display());
}

fn synth_command(cmd: SynthCmd) -> Result<()> {
    if cmd.bars == 0 {
        bail!("--bars must be > 0");
    }
    if cmd.interval <= 0 {
        bail!("--interval must be > 0 minutes");
    }

    let pair = generate_pair(&SyntheticPairConfig {
        bars: cmd.bars,
        ratio: cmd.ratio,
        noise: cmd.noise,
        seed: cmd.seed,
        ..Default::default()
    });
    if let Some(low) = pair
        .leg_a
        .iter()
        .chain(&pair.leg_b)
        .copied()
        .find(|p| *p <= 0.0)
    {
        tracing::warn!(price = low, "Synthetic series went non-positive; those rows will be dropped on load");
    }

    let out_dir = PathBuf::from(shellexpand::tilde(&cmd.out_dir.to_string_lossy()).into_owned());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .context("Invalid start timestamp")?;
    let step = Duration::minutes(cmd.interval);

    for (name, closes) in [("leg_a.csv", &pair.leg_a), ("leg_b.csv", &pair.leg_b)] {
        let path = out_dir.join(name);
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| (start + step * i as i32, *close));
        write_bars(&mut writer, bars)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} bars to {}", closes.len(), path.display());
    }

    Ok(())
}

fn validate_command(cmd: ValidateCmd) -> Result<()> {
    let config = load_config(&cmd.config)
        .with_context(|| format!("Invalid configuration: {}", cmd.config.display()))?;
    let strategy = StrategyConfig::from(&config);

    println!("Configuration OK: {}", cmd.config.display());
    println!("  Pair:              {} / {}", strategy.pair.leg_a, strategy.pair.leg_b);
    println!("  Formation window:  {}", strategy.formation_window);
    println!(
        "  Thresholds:        entry {} / exit {}",
        strategy.thresholds.entry, strategy.thresholds.exit
    );
    println!("  Re-estimate every: {} bars", strategy.reestimate_every);
    println!(
        "  Initial betas:     {} / {}",
        strategy.initial_beta_a, strategy.initial_beta_b
    );
    println!("  Capital at risk:   {:.2}%", strategy.capital_to_risk_ratio * 100.0);
    println!("  Starting balance:  {:.2}", config.backtest.starting_balance);
    let period = config.backtest.replay_period()?;
    if !period.is_unbounded() {
        println!("  Replay period:     {:?} .. {:?}", period.start, period.end);
    }
    Ok(())
}
