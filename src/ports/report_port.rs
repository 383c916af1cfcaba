//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FractalTraderError;
use std::path::Path;

/// Port for writing backtest artifacts.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), FractalTraderError>;
}
