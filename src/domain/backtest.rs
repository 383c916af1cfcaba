//! Backtest pipeline: bars -> fractals -> positions -> trades/equity -> metrics.
//!
//! BacktestConfig bundles the parameters of each stage.

use super::analytics::{AnalyticsConfig, PerformanceReport};
use super::error::FractalTraderError;
use super::ohlcv::Bar;
use super::signal::{SignalOutput, SignalParams, generate_positions};
use super::simulator::{EquityPoint, SimulationConfig, Trade, simulate};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestConfig {
    pub signal: SignalParams,
    pub simulation: SimulationConfig,
    pub analytics: AnalyticsConfig,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), FractalTraderError> {
        self.signal.validate()?;
        self.simulation.validate()?;
        self.analytics.validate()
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub signals: SignalOutput,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub report: PerformanceReport,
}

pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> Result<BacktestResult, FractalTraderError> {
    config.validate()?;
    let span = tracing::info_span!("backtest", bars = bars.len());
    let _guard = span.enter();

    let signals = generate_positions(bars, &config.signal)?;
    let simulation = simulate(bars, &signals.positions, &config.simulation)?;
    let report = PerformanceReport::compute(
        &simulation.trades,
        &simulation.equity_curve,
        config.simulation.initial_capital,
        &config.analytics,
    );

    tracing::info!(
        trades = report.total_trades,
        final_equity = report.final_equity,
        total_return = report.total_return,
        max_drawdown = report.max_drawdown,
        "backtest complete"
    );

    Ok(BacktestResult {
        signals,
        trades: simulation.trades,
        equity_curve: simulation.equity_curve,
        report,
    })
}
