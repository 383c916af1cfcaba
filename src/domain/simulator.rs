//! Trade simulation: replays a position series into trades and an equity curve.
//!
//! Trades open and close at the bar close. A flip between +1 and -1 closes
//! the open trade and opens the opposite one on the same bar. A trade still
//! open after the last bar is closed at the final close and flagged
//! `forced_exit`.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::error::FractalTraderError;
use super::ohlcv::Bar;
use super::position::{Position, Side};

/// Which commissions are charged against a trade's net P&L.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommissionPolicy {
    /// Only the exit commission reduces net P&L.
    #[default]
    ExitOnly,
    RoundTrip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Fraction of notional charged on each fill.
    pub commission_rate: f64,
    /// Fixed units per trade.
    pub position_size: f64,
    pub commission_policy: CommissionPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 10_000.0,
            commission_rate: 0.001,
            position_size: 0.1,
            commission_policy: CommissionPolicy::ExitOnly,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), FractalTraderError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(FractalTraderError::invalid_parameter(
                "initial_capital",
                "must be positive",
            ));
        }
        if !(self.commission_rate.is_finite() && self.commission_rate >= 0.0) {
            return Err(FractalTraderError::invalid_parameter(
                "commission_rate",
                "must be non-negative",
            ));
        }
        if !(self.position_size.is_finite() && self.position_size > 0.0) {
            return Err(FractalTraderError::invalid_parameter(
                "position_size",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Commission on one fill: price * size * rate.
pub fn calculate_commission(price: f64, size: f64, rate: f64) -> f64 {
    price * size * rate
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: Option<NaiveDateTime>,
    pub exit_price: Option<f64>,
    pub side: Side,
    pub size: f64,
    pub commission_entry: f64,
    pub commission_exit: f64,
    pub gross_pnl: f64,
    pub net_pnl: f64,
    pub forced_exit: bool,
}

impl Trade {
    fn open(bar: &Bar, side: Side, config: &SimulationConfig) -> Self {
        Trade {
            entry_time: bar.timestamp,
            entry_price: bar.close,
            exit_time: None,
            exit_price: None,
            side,
            size: config.position_size,
            commission_entry: calculate_commission(bar.close, config.position_size, config.commission_rate),
            commission_exit: 0.0,
            gross_pnl: 0.0,
            net_pnl: 0.0,
            forced_exit: false,
        }
    }

    fn close(&mut self, bar: &Bar, config: &SimulationConfig, forced: bool) {
        self.exit_time = Some(bar.timestamp);
        self.exit_price = Some(bar.close);
        self.commission_exit = calculate_commission(bar.close, self.size, config.commission_rate);
        self.gross_pnl = self.side.pnl(self.entry_price, bar.close, self.size);
        self.net_pnl = match config.commission_policy {
            CommissionPolicy::ExitOnly => self.gross_pnl - self.commission_exit,
            CommissionPolicy::RoundTrip => self.gross_pnl - self.total_commission(),
        };
        self.forced_exit = forced;
    }

    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    pub fn total_commission(&self) -> f64 {
        self.commission_entry + self.commission_exit
    }

    /// Mark-to-market P&L at `price`, before commissions.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.pnl(self.entry_price, price, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub equity: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Realized capital after all trades are closed.
    pub final_capital: f64,
}

impl SimulationResult {
    pub fn completed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| !t.is_open())
    }
}

pub fn simulate(
    bars: &[Bar],
    positions: &[Position],
    config: &SimulationConfig,
) -> Result<SimulationResult, FractalTraderError> {
    config.validate()?;
    if bars.len() != positions.len() {
        return Err(FractalTraderError::LengthMismatch {
            bars: bars.len(),
            positions: positions.len(),
        });
    }

    let mut capital = config.initial_capital;
    let mut trades: Vec<Trade> = Vec::new();
    let mut open: Option<Trade> = None;
    let mut equity_curve = Vec::with_capacity(bars.len());
    let last = bars.len().saturating_sub(1);

    for (i, (bar, &position)) in bars.iter().zip(positions).enumerate() {
        let target = position.side();
        let current = open.as_ref().map(|t| t.side);

        if current != target {
            if let Some(mut trade) = open.take() {
                trade.close(bar, config, false);
                capital += trade.net_pnl;
                tracing::debug!(
                    side = %trade.side,
                    exit_time = %bar.timestamp,
                    exit_price = bar.close,
                    net_pnl = trade.net_pnl,
                    "trade closed"
                );
                trades.push(trade);
            }
            if let Some(side) = target {
                tracing::debug!(%side, entry_time = %bar.timestamp, entry_price = bar.close, "trade opened");
                open = Some(Trade::open(bar, side, config));
            }
        }

        if i == last {
            if let Some(mut trade) = open.take() {
                trade.close(bar, config, true);
                capital += trade.net_pnl;
                tracing::debug!(side = %trade.side, net_pnl = trade.net_pnl, "open trade closed at end of data");
                trades.push(trade);
            }
        }

        let unrealized = open.as_ref().map_or(0.0, |t| t.unrealized_pnl(bar.close));
        equity_curve.push(EquityPoint {
            time: bar.timestamp,
            equity: capital + unrealized,
            price: bar.close,
        });
    }

    Ok(SimulationResult {
        trades,
        equity_curve,
        final_capital: capital,
    })
}
