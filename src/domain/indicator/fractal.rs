//! Williams fractal detection.
//!
//! A HIGH fractal at bar i holds when `high[i]` is the maximum of
//! `high[i-left..=i+right]`; a LOW fractal when `low[i]` is the minimum of
//! the same window of lows. Ties count as extrema.
//!
//! Two window policies are provided:
//! - [`detect_fractals`] (centered): every bar with a full window is tested
//!   against its neighbours, using look-ahead. Suited to offline backtests.
//! - [`StreamingFractalDetector`] (causal): bars are pushed one at a time
//!   into a FIFO of `left + right + 1` bars and a fractal is only reported
//!   once its `right` confirmation bars have been observed. A fractal is
//!   dropped when the previous step already saw one of the same kind, so
//!   flat plateaus produce a single signal.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::error::FractalTraderError;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FractalKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FractalPoint {
    pub index: usize,
    pub kind: FractalKind,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractalWindow {
    pub left: usize,
    pub right: usize,
}

impl Default for FractalWindow {
    fn default() -> Self {
        FractalWindow { left: 9, right: 9 }
    }
}

impl FractalWindow {
    pub fn new(left: usize, right: usize) -> Result<Self, FractalTraderError> {
        let window = FractalWindow { left, right };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), FractalTraderError> {
        if self.left == 0 {
            return Err(FractalTraderError::invalid_parameter(
                "fractal_left",
                "range must be positive",
            ));
        }
        if self.right == 0 {
            return Err(FractalTraderError::invalid_parameter(
                "fractal_right",
                "range must be positive",
            ));
        }
        if self.left.checked_add(self.right).and_then(|s| s.checked_add(1)).is_none() {
            return Err(FractalTraderError::invalid_parameter(
                "fractal_left",
                format!("window {}/{} is too large", self.left, self.right),
            ));
        }
        Ok(())
    }

    /// Bars covered by one window. Only meaningful on a validated window.
    pub fn span(&self) -> usize {
        self.left + self.right + 1
    }
}

/// Which window policy feeds the signal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FractalMode {
    #[default]
    Centered,
    Causal,
}

/// Per-bar fractal prices. `None` means no fractal of that kind at the bar.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FractalSeries {
    pub highs: Vec<Option<f64>>,
    pub lows: Vec<Option<f64>>,
}

impl FractalSeries {
    pub fn empty(len: usize) -> Self {
        FractalSeries {
            highs: vec![None; len],
            lows: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.highs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty()
    }

    pub fn high_at(&self, index: usize) -> Option<f64> {
        self.highs.get(index).copied().flatten()
    }

    pub fn low_at(&self, index: usize) -> Option<f64> {
        self.lows.get(index).copied().flatten()
    }

    /// All fractals in bar order, HIGH before LOW on the same bar.
    pub fn points(&self) -> Vec<FractalPoint> {
        let mut points = Vec::new();
        for index in 0..self.len() {
            if let Some(price) = self.high_at(index) {
                points.push(FractalPoint {
                    index,
                    kind: FractalKind::High,
                    price,
                });
            }
            if let Some(price) = self.low_at(index) {
                points.push(FractalPoint {
                    index,
                    kind: FractalKind::Low,
                    price,
                });
            }
        }
        points
    }
}

/// Centered detection over a complete history. Bars without a full window
/// on both sides carry no fractal.
pub fn detect_fractals(bars: &[Bar], window: FractalWindow) -> Result<FractalSeries, FractalTraderError> {
    window.validate()?;
    let n = bars.len();
    let mut series = FractalSeries::empty(n);
    if n < window.span() {
        return Ok(series);
    }

    for i in window.left..n - window.right {
        let neighbourhood = &bars[i - window.left..=i + window.right];
        let bar = &bars[i];
        if neighbourhood.iter().all(|b| b.high <= bar.high) {
            series.highs[i] = Some(bar.high);
        }
        if neighbourhood.iter().all(|b| b.low >= bar.low) {
            series.lows[i] = Some(bar.low);
        }
    }

    Ok(series)
}

/// Fractals confirmed by the latest pushed bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfirmedFractals {
    pub high: Option<FractalPoint>,
    pub low: Option<FractalPoint>,
}

#[derive(Debug, Clone, Copy)]
struct BufferedBar {
    index: usize,
    high: f64,
    low: f64,
}

/// Causal fractal detector for bar-by-bar feeds.
#[derive(Debug, Clone)]
pub struct StreamingFractalDetector {
    window: FractalWindow,
    buffer: VecDeque<BufferedBar>,
    next_index: usize,
    prev_high: bool,
    prev_low: bool,
}

impl StreamingFractalDetector {
    pub fn new(window: FractalWindow) -> Result<Self, FractalTraderError> {
        window.validate()?;
        Ok(StreamingFractalDetector {
            window,
            buffer: VecDeque::new(),
            next_index: 0,
            prev_high: false,
            prev_low: false,
        })
    }

    pub fn push(&mut self, bar: &Bar) -> ConfirmedFractals {
        self.buffer.push_back(BufferedBar {
            index: self.next_index,
            high: bar.high,
            low: bar.low,
        });
        self.next_index += 1;
        if self.buffer.len() > self.window.span() {
            self.buffer.pop_front();
        }
        if self.buffer.len() < self.window.span() {
            return ConfirmedFractals::default();
        }

        let candidate = self.buffer[self.window.left];
        let is_high = self.buffer.iter().all(|b| b.high <= candidate.high);
        let is_low = self.buffer.iter().all(|b| b.low >= candidate.low);

        let confirmed = ConfirmedFractals {
            high: (is_high && !self.prev_high).then_some(FractalPoint {
                index: candidate.index,
                kind: FractalKind::High,
                price: candidate.high,
            }),
            low: (is_low && !self.prev_low).then_some(FractalPoint {
                index: candidate.index,
                kind: FractalKind::Low,
                price: candidate.low,
            }),
        };
        self.prev_high = is_high;
        self.prev_low = is_low;
        confirmed
    }
}

/// Replays the streaming detector over a full history. Each fractal is
/// stored at the bar that confirmed it, carrying the fractal bar's price.
pub fn detect_fractals_causal(
    bars: &[Bar],
    window: FractalWindow,
) -> Result<FractalSeries, FractalTraderError> {
    let mut detector = StreamingFractalDetector::new(window)?;
    let mut series = FractalSeries::empty(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let confirmed = detector.push(bar);
        series.highs[i] = confirmed.high.map(|p| p.price);
        series.lows[i] = confirmed.low.map(|p| p.price);
    }
    Ok(series)
}
