//! OHLC(V) bar representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::FractalTraderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    /// |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Portion of the candle body lying above `level`.
    pub fn body_above(&self, level: f64) -> f64 {
        let top = self.body_top();
        let bottom = self.body_bottom();
        if top <= level {
            0.0
        } else if bottom >= level {
            top - bottom
        } else {
            top - level
        }
    }

    /// Portion of the candle body lying below `level`.
    pub fn body_below(&self, level: f64) -> f64 {
        let top = self.body_top();
        let bottom = self.body_bottom();
        if bottom >= level {
            0.0
        } else if top <= level {
            top - bottom
        } else {
            level - bottom
        }
    }
}

/// Check that timestamps are strictly increasing.
pub fn validate_bars(bars: &[Bar]) -> Result<(), FractalTraderError> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(FractalTraderError::UnorderedBars { index: i + 1 });
        }
    }
    Ok(())
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 1)
            .unwrap()
            .and_hms_opt(0, minute, 0)
            .unwrap()
    }

    fn candle(open: f64, close: f64) -> Bar {
        Bar {
            timestamp: ts(0),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: None,
        }
    }

    #[test]
    fn body_is_absolute() {
        assert!((candle(100.0, 104.0).body() - 4.0).abs() < f64::EPSILON);
        assert!((candle(104.0, 100.0).body() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn body_above_entirely_below_level() {
        assert_eq!(candle(100.0, 104.0).body_above(110.0), 0.0);
    }

    #[test]
    fn body_above_entirely_above_level() {
        assert!((candle(100.0, 104.0).body_above(90.0) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn body_above_partial_overlap() {
        // body 100..104, level 101 -> 3 above
        assert!((candle(100.0, 104.0).body_above(101.0) - 3.0).abs() < f64::EPSILON);
        // bearish candle, same geometry
        assert!((candle(104.0, 100.0).body_above(101.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn body_below_mirrors_body_above() {
        let bar = candle(100.0, 104.0);
        assert_eq!(bar.body_below(95.0), 0.0);
        assert!((bar.body_below(110.0) - 4.0).abs() < f64::EPSILON);
        assert!((bar.body_below(103.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_accepts_ascending() {
        let mut bars = vec![candle(1.0, 2.0), candle(2.0, 3.0)];
        bars[1].timestamp = ts(1);
        assert!(validate_bars(&bars).is_ok());
    }

    #[test]
    fn validate_rejects_duplicates() {
        let bars = vec![candle(1.0, 2.0), candle(2.0, 3.0)];
        let err = validate_bars(&bars).unwrap_err();
        assert!(matches!(err, FractalTraderError::UnorderedBars { index: 1 }));
    }

    #[test]
    fn validate_rejects_descending() {
        let mut bars = vec![candle(1.0, 2.0), candle(2.0, 3.0), candle(3.0, 4.0)];
        bars[0].timestamp = ts(0);
        bars[1].timestamp = ts(2);
        bars[2].timestamp = ts(1);
        let err = validate_bars(&bars).unwrap_err();
        assert!(matches!(err, FractalTraderError::UnorderedBars { index: 2 }));
    }

    #[test]
    fn validate_empty_is_ok() {
        assert!(validate_bars(&[]).is_ok());
    }
}
