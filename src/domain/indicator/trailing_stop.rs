//! Williams fractal trailing stops.
//!
//! Each LOW fractal arms a long stop at `low * (1 - buffer%)` and each HIGH
//! fractal arms a short stop at `high * (1 + buffer%)`. A stop holds while
//! price stays on its protected side and re-arms to the most recent fractal
//! level once price closes through it. Crossing the opposite stop flips the
//! trend direction.

use crate::domain::error::FractalTraderError;
use crate::domain::indicator::fractal::FractalSeries;
use crate::domain::ohlcv::Bar;
use crate::domain::position::Side;

/// Price used to detect a flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipOn {
    #[default]
    Close,
    /// High for upward flips, low for downward flips.
    Wick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingStopConfig {
    pub buffer_percent: f64,
    pub flip_on: FlipOn,
}

impl Default for TrailingStopConfig {
    fn default() -> Self {
        TrailingStopConfig {
            buffer_percent: 0.0,
            flip_on: FlipOn::Close,
        }
    }
}

impl TrailingStopConfig {
    pub fn validate(&self) -> Result<(), FractalTraderError> {
        if !self.buffer_percent.is_finite() || self.buffer_percent < 0.0 || self.buffer_percent >= 100.0 {
            return Err(FractalTraderError::invalid_parameter(
                "buffer_percent",
                "buffer must be in [0, 100)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrailingStopPoint {
    pub long_stop: Option<f64>,
    pub short_stop: Option<f64>,
    pub direction: Option<Side>,
}

/// Bar-by-bar trailing stop state.
#[derive(Debug, Clone)]
pub struct TrailingStopTracker {
    config: TrailingStopConfig,
    armed_long: Option<f64>,
    armed_short: Option<f64>,
    last: Option<TrailingStopPoint>,
}

impl TrailingStopTracker {
    pub fn new(config: TrailingStopConfig) -> Result<Self, FractalTraderError> {
        config.validate()?;
        Ok(TrailingStopTracker {
            config,
            armed_long: None,
            armed_short: None,
            last: None,
        })
    }

    /// Stops in force before the next bar is applied.
    pub fn current(&self) -> TrailingStopPoint {
        self.last.unwrap_or_default()
    }

    pub fn update(&mut self, bar: &Bar, high_fractal: Option<f64>, low_fractal: Option<f64>) -> TrailingStopPoint {
        let buffer = self.config.buffer_percent / 100.0;
        if let Some(low) = low_fractal {
            self.armed_long = Some(low * (1.0 - buffer));
        }
        if let Some(high) = high_fractal {
            self.armed_short = Some(high * (1.0 + buffer));
        }

        let Some(prev) = self.last else {
            let first = TrailingStopPoint {
                long_stop: self.armed_long,
                short_stop: self.armed_short,
                direction: None,
            };
            self.last = Some(first);
            return first;
        };

        let long_stop = match prev.long_stop {
            Some(stop) if bar.close >= stop => Some(stop),
            _ => self.armed_long,
        };
        let short_stop = match prev.short_stop {
            Some(stop) if bar.close <= stop => Some(stop),
            _ => self.armed_short,
        };

        let (up_source, down_source) = match self.config.flip_on {
            FlipOn::Close => (bar.close, bar.close),
            FlipOn::Wick => (bar.high, bar.low),
        };
        let mut flip_long = prev.direction != Some(Side::Long)
            && prev.short_stop.is_some_and(|stop| up_source > stop);
        let mut flip_short = prev.direction != Some(Side::Short)
            && prev.long_stop.is_some_and(|stop| down_source < stop);
        if flip_long && flip_short {
            if long_stop.is_some_and(|stop| bar.close > stop) {
                flip_short = false;
            } else {
                flip_long = false;
            }
        }

        let direction = if flip_long {
            Some(Side::Long)
        } else if flip_short {
            Some(Side::Short)
        } else {
            prev.direction
        };

        let point = TrailingStopPoint {
            long_stop,
            short_stop,
            direction,
        };
        self.last = Some(point);
        point
    }
}

pub fn williams_trailing_stops(
    bars: &[Bar],
    fractals: &FractalSeries,
    config: TrailingStopConfig,
) -> Result<Vec<TrailingStopPoint>, FractalTraderError> {
    let mut tracker = TrailingStopTracker::new(config)?;
    Ok(bars
        .iter()
        .enumerate()
        .map(|(i, bar)| tracker.update(bar, fractals.high_at(i), fractals.low_at(i)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(i: u32, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2025, 8, 1)
                .unwrap()
                .and_hms_opt(1, i, 0)
                .unwrap(),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: None,
        }
    }

    fn config(buffer_percent: f64) -> TrailingStopConfig {
        TrailingStopConfig {
            buffer_percent,
            flip_on: FlipOn::Close,
        }
    }

    #[test]
    fn rejects_negative_buffer() {
        assert!(TrailingStopTracker::new(config(-1.0)).is_err());
        assert!(TrailingStopTracker::new(config(f64::NAN)).is_err());
    }

    #[test]
    fn buffer_applied_to_fractal_levels() {
        let mut tracker = TrailingStopTracker::new(config(1.0)).unwrap();
        let point = tracker.update(&bar(0, 100.0), Some(110.0), Some(90.0));
        assert!((point.long_stop.unwrap() - 89.1).abs() < 1e-9);
        assert!((point.short_stop.unwrap() - 111.1).abs() < 1e-9);
        assert_eq!(point.direction, None);
    }

    #[test]
    fn long_stop_holds_while_price_above() {
        let mut tracker = TrailingStopTracker::new(config(0.0)).unwrap();
        tracker.update(&bar(0, 100.0), None, Some(95.0));
        // a higher fractal arrives but price never broke the stop
        let point = tracker.update(&bar(1, 101.0), None, Some(98.0));
        assert_eq!(point.long_stop, Some(95.0));
    }

    #[test]
    fn long_stop_rearms_after_break() {
        let mut tracker = TrailingStopTracker::new(config(0.0)).unwrap();
        tracker.update(&bar(0, 100.0), None, Some(95.0));
        tracker.update(&bar(1, 101.0), None, Some(93.0));
        let point = tracker.update(&bar(2, 94.0), None, None);
        assert_eq!(point.long_stop, Some(93.0));
    }

    #[test]
    fn close_above_short_stop_flips_long() {
        let mut tracker = TrailingStopTracker::new(config(0.0)).unwrap();
        tracker.update(&bar(0, 100.0), Some(102.0), None);
        let point = tracker.update(&bar(1, 103.0), None, None);
        assert_eq!(point.direction, Some(Side::Long));
    }

    #[test]
    fn close_below_long_stop_flips_short() {
        let mut tracker = TrailingStopTracker::new(config(0.0)).unwrap();
        tracker.update(&bar(0, 100.0), None, Some(98.0));
        let point = tracker.update(&bar(1, 97.0), None, None);
        assert_eq!(point.direction, Some(Side::Short));
    }

    #[test]
    fn wick_flip_uses_high() {
        let mut tracker = TrailingStopTracker::new(TrailingStopConfig {
            buffer_percent: 0.0,
            flip_on: FlipOn::Wick,
        })
        .unwrap();
        tracker.update(&bar(0, 100.0), Some(101.8), None);
        // close 101.5 stays below the stop, high 102.0 pierces it
        let point = tracker.update(&bar(1, 101.5), None, None);
        assert_eq!(point.direction, Some(Side::Long));
    }

    #[test]
    fn wick_flip_short_uses_low() {
        let mut tracker = TrailingStopTracker::new(TrailingStopConfig {
            buffer_percent: 0.0,
            flip_on: FlipOn::Wick,
        })
        .unwrap();
        tracker.update(&bar(0, 100.0), None, Some(98.0));
        // close 98.3 holds the stop, low 97.8 breaks it
        let point = tracker.update(&bar(1, 98.3), None, None);
        assert_eq!(point.direction, Some(Side::Short));
        assert_eq!(point.long_stop, Some(98.0));
    }

    #[test]
    fn batch_matches_tracker() {
        let bars: Vec<Bar> = (0..6).map(|i| bar(i, 100.0 + i as f64)).collect();
        let mut fractals = FractalSeries::empty(bars.len());
        fractals.lows[1] = Some(99.0);
        fractals.highs[2] = Some(103.0);

        let batch = williams_trailing_stops(&bars, &fractals, config(0.0)).unwrap();
        let mut tracker = TrailingStopTracker::new(config(0.0)).unwrap();
        for (i, b) in bars.iter().enumerate() {
            assert_eq!(batch[i], tracker.update(b, fractals.high_at(i), fractals.low_at(i)));
        }
        assert_eq!(tracker.current(), *batch.last().unwrap());
    }
}
