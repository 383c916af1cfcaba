#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use fractaltrader::domain::backtest::BacktestResult;
use fractaltrader::domain::error::FractalTraderError;
pub use fractaltrader::domain::ohlcv::Bar;
use fractaltrader::ports::data_port::DataPort;
use fractaltrader::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, error: None }
    }

    pub fn with_error(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        _symbol: Option<&str>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, FractalTraderError> {
        if let Some(reason) = &self.error {
            return Err(FractalTraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| start.is_none_or(|s| b.timestamp >= s) && end.is_none_or(|e| b.timestamp <= e))
            .cloned()
            .collect())
    }
}

/// Records every write instead of touching the filesystem.
#[derive(Default)]
pub struct MockReportPort {
    pub writes: RefCell<Vec<(PathBuf, usize, usize)>>,
}

impl ReportPort for MockReportPort {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), FractalTraderError> {
        self.writes.borrow_mut().push((
            output_dir.to_path_buf(),
            result.trades.len(),
            result.equity_curve.len(),
        ));
        Ok(())
    }
}

pub fn minute(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 8, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::minutes(i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: minute(i),
        open,
        high,
        low,
        close,
        volume: Some(1000.0),
    }
}

/// Bars whose open is the previous close, with a small wick either side.
pub fn generate_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            make_bar(i, open, open.max(close) + 0.1, open.min(close) - 0.1, close)
        })
        .collect()
}

pub fn flat_bars(count: usize, price: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| make_bar(i, price, price, price, price))
        .collect()
}

fn rising_bar(i: usize, close: f64) -> Bar {
    let open = close - 0.05;
    make_bar(i, open, close + 0.02, open - 0.02, close)
}

/// 200 flat bars, then a steady climb with a spike high at bar 210 and a
/// candle at bar 215 whose body mostly clears that spike.
pub fn breakout_bars() -> Vec<Bar> {
    (0..250)
        .map(|i| match i {
            0..200 => make_bar(i, 100.0, 100.05, 99.95, 100.0),
            210 => {
                let mut bar = rising_bar(i, 100.0 + 0.1 * (i as f64 - 199.0));
                bar.high = 103.0;
                bar
            }
            215 => make_bar(i, 102.9, 103.6, 102.85, 103.5),
            216.. => rising_bar(i, 103.5 + 0.1 * (i as f64 - 215.0)),
            _ => rising_bar(i, 100.0 + 0.1 * (i as f64 - 199.0)),
        })
        .collect()
}
