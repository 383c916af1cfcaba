//! Exponential Moving Average trend filter.
//!
//! k = 2/(n+1), seed with the SMA of the first n closes, then
//! EMA[i] = EMA[i-1] + k * (C[i] - EMA[i-1]).
//! Warmup: first (n-1) bars are undefined.

use crate::domain::error::FractalTraderError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::{Bar, closes};

/// Incremental EMA. Feeding the same prices yields the same values as
/// [`calculate_ema`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmaState {
    period: usize,
    k: f64,
    count: usize,
    sum: f64,
    value: Option<f64>,
}

impl EmaState {
    pub fn new(period: usize) -> Result<Self, FractalTraderError> {
        if period == 0 {
            return Err(FractalTraderError::invalid_parameter(
                "ema_period",
                "period must be positive",
            ));
        }
        Ok(EmaState {
            period,
            k: 2.0 / (period as f64 + 1.0),
            count: 0,
            sum: 0.0,
            value: None,
        })
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn update(&mut self, price: f64) -> Option<f64> {
        self.count += 1;
        self.value = match self.value {
            Some(ema) => Some(ema + self.k * (price - ema)),
            None => {
                self.sum += price;
                if self.count == self.period {
                    Some(self.sum / self.period as f64)
                } else {
                    None
                }
            }
        };
        self.value
    }
}

/// EMA over a raw price series, one entry per observation.
pub fn calculate_ema(prices: &[f64], period: usize) -> Result<Vec<Option<f64>>, FractalTraderError> {
    let mut state = EmaState::new(period)?;
    if prices.len() < period {
        return Err(FractalTraderError::InsufficientData {
            bars: prices.len(),
            minimum: period,
        });
    }
    Ok(prices.iter().map(|&p| state.update(p)).collect())
}

/// EMA of bar closes, aligned to the bars' timestamps.
pub fn calculate_ema_series(bars: &[Bar], period: usize) -> Result<IndicatorSeries, FractalTraderError> {
    let ema = calculate_ema(&closes(bars), period)?;
    Ok(IndicatorSeries {
        name: format!("EMA({})", period),
        values: bars
            .iter()
            .zip(ema)
            .map(|(bar, value)| IndicatorPoint {
                timestamp: bar.timestamp,
                valid: value.is_some(),
                value: value.unwrap_or(0.0),
            })
            .collect(),
    })
}

/// Like [`calculate_ema_series`] but a history shorter than `period`
/// yields an all-undefined series instead of an error.
pub fn calculate_ema_series_lenient(
    bars: &[Bar],
    period: usize,
) -> Result<IndicatorSeries, FractalTraderError> {
    match calculate_ema_series(bars, period) {
        Err(FractalTraderError::InsufficientData { bars: have, minimum }) => {
            tracing::warn!(have, minimum, "history shorter than EMA period, series left undefined");
            Ok(IndicatorSeries {
                name: format!("EMA({})", period),
                values: bars
                    .iter()
                    .map(|bar| IndicatorPoint {
                        timestamp: bar.timestamp,
                        valid: false,
                        value: 0.0,
                    })
                    .collect(),
            })
        }
        other => other,
    }
}
