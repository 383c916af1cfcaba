//! File report adapter.
//!
//! Writes three artifacts into an output directory:
//! - `trades.csv`: one row per trade
//! - `equity.csv`: one row per bar (time, equity, price)
//! - `metrics.json`: the flat metric mapping

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FractalTraderError;
use crate::domain::position::Side;
use crate::domain::simulator::Trade;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity.csv";
pub const METRICS_FILE: &str = "metrics.json";

#[derive(Serialize)]
struct TradeRow {
    entry_time: NaiveDateTime,
    entry_price: f64,
    exit_time: Option<NaiveDateTime>,
    exit_price: Option<f64>,
    side: Side,
    size: f64,
    commission: f64,
    net_pnl: f64,
    forced_exit: bool,
}

impl From<&Trade> for TradeRow {
    fn from(trade: &Trade) -> Self {
        TradeRow {
            entry_time: trade.entry_time,
            entry_price: trade.entry_price,
            exit_time: trade.exit_time,
            exit_price: trade.exit_price,
            side: trade.side,
            size: trade.size,
            commission: trade.total_commission(),
            net_pnl: trade.net_pnl,
            forced_exit: trade.forced_exit,
        }
    }
}

fn csv_error(path: &Path, e: csv::Error) -> FractalTraderError {
    FractalTraderError::Serialize {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

fn write_csv<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
    headers: &[&str],
) -> Result<(), FractalTraderError> {
    // serde only emits headers for the first record, so write them ourselves
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    writer.write_record(headers).map_err(|e| csv_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| csv_error(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct FileReportAdapter;

impl FileReportAdapter {
    pub fn new() -> Self {
        FileReportAdapter
    }
}

impl ReportPort for FileReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), FractalTraderError> {
        fs::create_dir_all(output_dir)?;

        write_csv(
            &output_dir.join(TRADES_FILE),
            result.trades.iter().map(TradeRow::from),
            &[
                "entry_time",
                "entry_price",
                "exit_time",
                "exit_price",
                "side",
                "size",
                "commission",
                "net_pnl",
                "forced_exit",
            ],
        )?;
        write_csv(
            &output_dir.join(EQUITY_FILE),
            result.equity_curve.iter(),
            &["time", "equity", "price"],
        )?;

        let json = serde_json::to_string_pretty(&result.report).map_err(|e| FractalTraderError::Serialize {
            reason: format!("failed to encode metrics: {}", e),
        })?;
        fs::write(output_dir.join(METRICS_FILE), json)?;

        tracing::info!(dir = %output_dir.display(), trades = result.trades.len(), "report written");
        Ok(())
    }
}
