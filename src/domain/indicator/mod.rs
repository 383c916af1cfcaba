//! Technical indicator implementations.
//!
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorSeries`: a named, bar-aligned series of indicator points
//!
//! The EMA trend filter lives in [`ema`], Williams fractals in [`fractal`]
//! and the fractal trailing stops in [`trailing_stop`].

pub mod ema;
pub mod fractal;
pub mod trailing_stop;

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub name: String,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at bar `index`, or `None` during warm-up or past the end.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of leading bars without a valid value.
    pub fn warmup(&self) -> usize {
        self.values.iter().take_while(|p| !p.valid).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(day: u32, valid: bool, value: f64) -> IndicatorPoint {
        IndicatorPoint {
            timestamp: NaiveDate::from_ymd_opt(2025, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            valid,
            value,
        }
    }

    #[test]
    fn value_at_hides_warmup() {
        let series = IndicatorSeries {
            name: "EMA(2)".into(),
            values: vec![point(1, false, 0.0), point(2, true, 10.0)],
        };
        assert_eq!(series.value_at(0), None);
        assert_eq!(series.value_at(1), Some(10.0));
        assert_eq!(series.value_at(2), None);
    }

    #[test]
    fn warmup_counts_leading_invalid() {
        let series = IndicatorSeries {
            name: "EMA(3)".into(),
            values: vec![
                point(1, false, 0.0),
                point(2, false, 0.0),
                point(3, true, 1.0),
                point(4, true, 2.0),
            ],
        };
        assert_eq!(series.warmup(), 2);
        assert_eq!(series.len(), 4);
        assert!(!series.is_empty());
    }
}
