//! Performance analytics over a simulated run.
//!
//! [`PerformanceReport::compute`] is a pure function of the trades, the
//! equity curve and the initial capital. Every ratio is guarded: a zero
//! denominator yields 0, except the profit factor which is +inf when there
//! are winners and no losers.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

use super::error::FractalTraderError;
use super::simulator::{EquityPoint, Trade};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

/// How the span of the equity curve is converted to days.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AnnualizationBasis {
    /// Whole days between the first and last equity timestamps.
    #[default]
    WallClock,
    /// `(points - 1) / bars_per_day`.
    BarsPerDay(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub risk_free_rate: f64,
    pub annualization: AnnualizationBasis,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            risk_free_rate: 0.02,
            annualization: AnnualizationBasis::WallClock,
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<(), FractalTraderError> {
        if !self.risk_free_rate.is_finite() {
            return Err(FractalTraderError::invalid_parameter(
                "risk_free_rate",
                "must be finite",
            ));
        }
        if let AnnualizationBasis::BarsPerDay(bars) = self.annualization {
            if !(bars.is_finite() && bars > 0.0) {
                return Err(FractalTraderError::invalid_parameter(
                    "bars_per_day",
                    "must be positive",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerformanceReport {
    // basic
    pub total_return: f64,
    pub final_equity: f64,
    pub annualized_return: f64,
    pub total_days: f64,
    // risk
    pub daily_volatility: f64,
    pub annualized_volatility: f64,
    pub var_95: f64,
    pub var_99: f64,
    pub max_loss: f64,
    // trades
    pub total_trades: usize,
    pub completed_trades: usize,
    pub open_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub avg_trade: f64,
    // drawdown
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    pub avg_drawdown_duration: f64,
    pub max_drawdown_duration: usize,
    // ratios
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub recovery_factor: f64,
    pub risk_adjusted_return: f64,
}

impl PerformanceReport {
    pub fn compute(
        trades: &[Trade],
        equity_curve: &[EquityPoint],
        initial_capital: f64,
        config: &AnalyticsConfig,
    ) -> Self {
        let mut report = PerformanceReport::default();
        compute_basic(&mut report, equity_curve, initial_capital, config.annualization);

        let returns = bar_returns(equity_curve);
        compute_risk(&mut report, &returns);
        compute_trade_stats(&mut report, trades);
        compute_drawdown(&mut report, equity_curve);
        compute_ratios(&mut report, &returns, config.risk_free_rate);
        report
    }

    /// Flat metric name to value mapping.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("total_return", self.total_return),
            ("final_equity", self.final_equity),
            ("annualized_return", self.annualized_return),
            ("total_days", self.total_days),
            ("daily_volatility", self.daily_volatility),
            ("annualized_volatility", self.annualized_volatility),
            ("var_95", self.var_95),
            ("var_99", self.var_99),
            ("max_loss", self.max_loss),
            ("total_trades", self.total_trades as f64),
            ("completed_trades", self.completed_trades as f64),
            ("open_trades", self.open_trades as f64),
            ("winning_trades", self.winning_trades as f64),
            ("losing_trades", self.losing_trades as f64),
            ("win_rate", self.win_rate),
            ("total_pnl", self.total_pnl),
            ("avg_win", self.avg_win),
            ("avg_loss", self.avg_loss),
            ("largest_win", self.largest_win),
            ("largest_loss", self.largest_loss),
            ("gross_profit", self.gross_profit),
            ("gross_loss", self.gross_loss),
            ("profit_factor", self.profit_factor),
            ("avg_trade", self.avg_trade),
            ("max_drawdown", self.max_drawdown),
            ("current_drawdown", self.current_drawdown),
            ("avg_drawdown_duration", self.avg_drawdown_duration),
            ("max_drawdown_duration", self.max_drawdown_duration as f64),
            ("sharpe_ratio", self.sharpe_ratio),
            ("sortino_ratio", self.sortino_ratio),
            ("calmar_ratio", self.calmar_ratio),
            ("recovery_factor", self.recovery_factor),
            ("risk_adjusted_return", self.risk_adjusted_return),
        ])
    }
}

/// Non-finite values are written as "Infinity", "-Infinity" or "NaN".
impl Serialize for PerformanceReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let metrics = self.to_map();
        let mut map = serializer.serialize_map(Some(metrics.len()))?;
        for (key, value) in metrics {
            if value.is_finite() {
                map.serialize_entry(key, &value)?;
            } else {
                map.serialize_entry(key, non_finite_sentinel(value))?;
            }
        }
        map.end()
    }
}

fn non_finite_sentinel(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    }
}

fn compute_basic(
    report: &mut PerformanceReport,
    equity_curve: &[EquityPoint],
    initial_capital: f64,
    basis: AnnualizationBasis,
) {
    let final_equity = equity_curve.last().map_or(initial_capital, |p| p.equity);
    report.final_equity = final_equity;
    if initial_capital <= 0.0 {
        return;
    }
    report.total_return = (final_equity / initial_capital - 1.0) * 100.0;

    report.total_days = match (equity_curve.first(), equity_curve.last()) {
        (Some(first), Some(last)) => match basis {
            AnnualizationBasis::WallClock => (last.time - first.time).num_days() as f64,
            AnnualizationBasis::BarsPerDay(bars) => (equity_curve.len() - 1) as f64 / bars,
        },
        _ => 0.0,
    };

    let growth = final_equity / initial_capital;
    if report.total_days > 0.0 && growth > 0.0 {
        report.annualized_return = (growth.powf(CALENDAR_DAYS_PER_YEAR / report.total_days) - 1.0) * 100.0;
    }
}

/// Simple per-bar returns. A zero previous equity yields a zero return.
fn bar_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev != 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0 for fewer than two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Percentile with linear interpolation between order statistics.
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

fn compute_risk(report: &mut PerformanceReport, returns: &[f64]) {
    if returns.is_empty() {
        return;
    }
    let std = sample_std(returns);
    report.daily_volatility = std * 100.0;
    report.annualized_volatility = std * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;
    report.var_95 = percentile(returns, 5.0) * 100.0;
    report.var_99 = percentile(returns, 1.0) * 100.0;
    report.max_loss = returns.iter().copied().fold(f64::INFINITY, f64::min) * 100.0;
}

fn compute_trade_stats(report: &mut PerformanceReport, trades: &[Trade]) {
    report.total_trades = trades.len();
    let completed: Vec<f64> = trades.iter().filter(|t| !t.is_open()).map(|t| t.net_pnl).collect();
    report.completed_trades = completed.len();
    report.open_trades = trades.len() - completed.len();
    if completed.is_empty() {
        return;
    }

    let wins: Vec<f64> = completed.iter().copied().filter(|&p| p > 0.0).collect();
    let losses: Vec<f64> = completed.iter().copied().filter(|&p| p < 0.0).collect();

    report.winning_trades = wins.len();
    report.losing_trades = losses.len();
    report.win_rate = wins.len() as f64 / completed.len() as f64 * 100.0;
    report.total_pnl = completed.iter().sum();
    report.avg_trade = mean(&completed);
    report.avg_win = mean(&wins);
    report.avg_loss = mean(&losses);
    report.largest_win = wins.iter().copied().fold(0.0, f64::max);
    report.largest_loss = losses.iter().copied().fold(0.0, f64::min);
    report.gross_profit = wins.iter().sum();
    report.gross_loss = losses.iter().sum();

    report.profit_factor = if report.gross_loss < 0.0 {
        report.gross_profit / report.gross_loss.abs()
    } else if report.gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
}

fn compute_drawdown(report: &mut PerformanceReport, equity_curve: &[EquityPoint]) {
    let mut peak = f64::NEG_INFINITY;
    let mut runs: Vec<usize> = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut drawdown = 0.0;

    for (i, point) in equity_curve.iter().enumerate() {
        peak = peak.max(point.equity);
        drawdown = if peak > 0.0 {
            (point.equity - peak) / peak * 100.0
        } else {
            0.0
        };
        report.max_drawdown = report.max_drawdown.min(drawdown);

        match (drawdown < 0.0, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                runs.push(i - start);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push(equity_curve.len() - start);
    }

    report.current_drawdown = drawdown;
    report.max_drawdown_duration = runs.iter().copied().max().unwrap_or(0);
    if !runs.is_empty() {
        report.avg_drawdown_duration = runs.iter().sum::<usize>() as f64 / runs.len() as f64;
    }
}

fn compute_ratios(report: &mut PerformanceReport, returns: &[f64], risk_free_rate: f64) {
    let std = sample_std(returns);
    let excess = mean(returns) - risk_free_rate / TRADING_DAYS_PER_YEAR;
    if std > 0.0 {
        report.sharpe_ratio = excess / std * TRADING_DAYS_PER_YEAR.sqrt();
    }

    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_std = sample_std(&downside);
    if downside_std > 0.0 {
        report.sortino_ratio = excess / downside_std * TRADING_DAYS_PER_YEAR.sqrt();
    }

    let max_dd = report.max_drawdown.abs();
    if max_dd > 0.0 {
        report.calmar_ratio = report.annualized_return / max_dd;
        report.recovery_factor = (report.total_return / max_dd).abs();
        report.risk_adjusted_return = report.total_return / max_dd;
    }
}
