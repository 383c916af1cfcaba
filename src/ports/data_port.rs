//! Data access port trait.

use crate::domain::error::FractalTraderError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDateTime;

pub trait DataPort {
    /// Bars in ascending timestamp order, optionally restricted to one
    /// symbol and an inclusive time range.
    fn fetch_bars(
        &self,
        symbol: Option<&str>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, FractalTraderError>;
}
