//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvAdapter, parse_timestamp};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_report_adapter::FileReportAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::build_backtest_config;
use crate::domain::error::FractalTraderError;
use crate::domain::indicator::fractal::FractalMode;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "fractaltrader", about = "EMA + Williams fractal breakout backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a CSV of bars
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [backtest] data_path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Keep only rows whose symbol column matches
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, value_parser = parse_timestamp)]
        start: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_timestamp)]
        end: Option<NaiveDateTime>,
        /// Directory for trades.csv, equity.csv and metrics.json
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Bar selection passed to the data port.
#[derive(Debug, Clone, Default)]
pub struct DataQuery {
    pub symbol: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            symbol,
            start,
            end,
            output,
            dry_run,
        } => {
            let query = DataQuery { symbol, start, end };
            if dry_run {
                run_dry_run(&config, data.as_deref())
            } else {
                run_backtest(&config, data.as_deref(), &query, output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(&e, &mut std::io::stderr()),
    }
}

/// Writes the error to `out` whatever the log filter, and maps it to an exit code.
pub fn report_failure(err: &FractalTraderError, out: &mut dyn std::io::Write) -> ExitCode {
    tracing::error!("{err}");
    let _ = std::io::Write::write_fmt(out, format_args!("Error: {err}\n"));
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FractalTraderError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    tracing::debug!(source = adapter.source(), "config loaded");
    Ok(adapter)
}

/// The `--data` flag wins over `[backtest] data_path`.
pub fn resolve_data_path(
    data_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, FractalTraderError> {
    if let Some(path) = data_override {
        return Ok(path.to_path_buf());
    }
    config
        .get_optional_string("backtest", "data_path")
        .map(PathBuf::from)
        .ok_or_else(|| FractalTraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "data_path".to_string(),
        })
}

fn run_backtest(
    config_path: &Path,
    data_override: Option<&Path>,
    query: &DataQuery,
    output_dir: Option<&Path>,
) -> Result<(), FractalTraderError> {
    tracing::info!(config = %config_path.display(), "loading config");
    let adapter = load_config(config_path)?;
    let config = build_backtest_config(&adapter)?;
    let data_path = resolve_data_path(data_override, &adapter)?;

    let data_port = CsvAdapter::new(data_path);
    let report_port = FileReportAdapter::new();
    let result = run_backtest_pipeline(
        &data_port,
        output_dir.map(|dir| (&report_port as &dyn ReportPort, dir)),
        &config,
        query,
    )?;

    print!("{}", format_summary(&result, &config));
    if let Some(dir) = output_dir {
        println!("\nReport written to: {}", dir.display());
    }
    Ok(())
}

/// Fetch, backtest and optionally write the report.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report: Option<(&dyn ReportPort, &Path)>,
    config: &BacktestConfig,
    query: &DataQuery,
) -> Result<BacktestResult, FractalTraderError> {
    let bars = data_port.fetch_bars(query.symbol.as_deref(), query.start, query.end)?;
    if bars.is_empty() {
        return Err(FractalTraderError::Data {
            reason: "no bars matched the query".into(),
        });
    }
    tracing::info!(
        bars = bars.len(),
        first = %bars[0].timestamp,
        last = %bars[bars.len() - 1].timestamp,
        "running backtest"
    );

    let result = backtest_engine::run_backtest(&bars, config)?;
    if let Some((port, dir)) = report {
        port.write(&result, dir)?;
    }
    Ok(result)
}

fn describe_config(config: &BacktestConfig) -> String {
    let signal = &config.signal;
    let mut out = String::new();
    let _ = writeln!(out, "Strategy:");
    let _ = writeln!(out, "  EMA period:       {}", signal.ema_period);
    if let Some(trend) = signal.trend_ema_period {
        let _ = writeln!(out, "  Trend EMA period: {}", trend);
    }
    let _ = writeln!(
        out,
        "  Fractal window:   {}/{} ({})",
        signal.fractal_window.left,
        signal.fractal_window.right,
        match signal.fractal_mode {
            FractalMode::Centered => "centered",
            FractalMode::Causal => "causal",
        }
    );
    let _ = writeln!(out, "  Breakout body:    {:.0}%", signal.breakout_threshold * 100.0);
    if let Some(stop) = &signal.trailing_stop {
        let _ = writeln!(
            out,
            "  Trailing stop:    buffer {}% flip on {:?}",
            stop.buffer_percent, stop.flip_on
        );
    }
    let sim = &config.simulation;
    let _ = writeln!(out, "Simulation:");
    let _ = writeln!(out, "  Initial capital:  {:.2}", sim.initial_capital);
    let _ = writeln!(out, "  Commission rate:  {}", sim.commission_rate);
    let _ = writeln!(out, "  Position size:    {}", sim.position_size);
    let _ = writeln!(out, "  Commission:       {:?}", sim.commission_policy);
    out
}

pub fn format_summary(result: &BacktestResult, config: &BacktestConfig) -> String {
    let m = &result.report;
    let mut out = describe_config(config);
    let _ = writeln!(out, "\n=== Results ===");
    let _ = writeln!(out, "Final Equity:     {:.2}", m.final_equity);
    let _ = writeln!(out, "Total Return:     {:.2}%", m.total_return);
    let _ = writeln!(out, "Annualized:       {:.2}%", m.annualized_return);
    let _ = writeln!(out, "Volatility (ann): {:.2}%", m.annualized_volatility);
    let _ = writeln!(out, "Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    let _ = writeln!(out, "Sortino Ratio:    {:.2}", m.sortino_ratio);
    let _ = writeln!(out, "Calmar Ratio:     {:.2}", m.calmar_ratio);
    let _ = writeln!(out, "Max Drawdown:     {:.2}%", m.max_drawdown);
    let _ = writeln!(out, "Total Trades:     {}", m.total_trades);
    let _ = writeln!(out, "Win Rate:         {:.1}%", m.win_rate);
    let _ = writeln!(out, "Profit Factor:    {:.2}", m.profit_factor);
    out
}

pub fn run_dry_run(config_path: &Path, data_override: Option<&Path>) -> Result<(), FractalTraderError> {
    let adapter = load_config(config_path)?;
    let config = build_backtest_config(&adapter)?;
    let data_path = resolve_data_path(data_override, &adapter)?;

    print!("{}", describe_config(&config));
    println!("Data:\n  {}", data_path.display());
    println!("\nDry run complete: configuration is valid");
    Ok(())
}

pub fn run_validate(config_path: &Path) -> Result<(), FractalTraderError> {
    let adapter = load_config(config_path)?;
    let config = build_backtest_config(&adapter)?;
    print!("{}", describe_config(&config));
    println!("\nConfiguration is valid");
    Ok(())
}
