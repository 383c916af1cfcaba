//! Breakout signal engine.
//!
//! Two independent tracks (long and short) are folded over the bars in one
//! pass. Each bar, in this order, a track:
//! 1. drops its setup when an opposite fractal prints,
//! 2. takes a same-side fractal as its reference level if the close is on
//!    the trend side of the EMA,
//! 3. opens if a breakout was confirmed on the previous bar,
//! 4. otherwise tests the candle body against the reference level,
//! 5. otherwise closes an open position when the close crosses the EMA
//!    (or the trailing stop, when enabled).
//!
//! The two tracks are reconciled per bar by [`combine_positions`].

use chrono::NaiveDateTime;

use super::error::FractalTraderError;
use super::indicator::IndicatorSeries;
use super::indicator::ema::{EmaState, calculate_ema_series_lenient};
use super::indicator::fractal::{
    FractalMode, FractalSeries, FractalWindow, StreamingFractalDetector, detect_fractals,
    detect_fractals_causal,
};
use super::indicator::trailing_stop::{
    TrailingStopConfig, TrailingStopPoint, TrailingStopTracker, williams_trailing_stops,
};
use super::ohlcv::{Bar, validate_bars};
use super::position::{Position, Side, combine_positions};

#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub ema_period: usize,
    /// Optional slower EMA the close must also clear before a breakout is tested.
    pub trend_ema_period: Option<usize>,
    pub fractal_window: FractalWindow,
    pub fractal_mode: FractalMode,
    /// Fraction of the candle body that must lie beyond the reference level.
    pub breakout_threshold: f64,
    pub trailing_stop: Option<TrailingStopConfig>,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            ema_period: 200,
            trend_ema_period: None,
            fractal_window: FractalWindow::default(),
            fractal_mode: FractalMode::Centered,
            breakout_threshold: 0.5,
            trailing_stop: None,
        }
    }
}

impl SignalParams {
    pub fn validate(&self) -> Result<(), FractalTraderError> {
        if self.ema_period == 0 {
            return Err(FractalTraderError::invalid_parameter(
                "ema_period",
                "period must be positive",
            ));
        }
        if let Some(trend) = self.trend_ema_period {
            if trend <= self.ema_period {
                return Err(FractalTraderError::invalid_parameter(
                    "trend_ema_period",
                    format!(
                        "trend period ({}) must be greater than ema_period ({})",
                        trend, self.ema_period
                    ),
                ));
            }
        }
        self.fractal_window.validate()?;
        if !(self.breakout_threshold > 0.0 && self.breakout_threshold <= 1.0) {
            return Err(FractalTraderError::invalid_parameter(
                "breakout_threshold",
                "threshold must be in (0, 1]",
            ));
        }
        if let Some(stop) = &self.trailing_stop {
            stop.validate()?;
        }
        Ok(())
    }
}

/// Everything the engine sees for one bar.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    pub bar: &'a Bar,
    pub ema: Option<f64>,
    pub trend_ema: Option<f64>,
    pub high_fractal: Option<f64>,
    pub low_fractal: Option<f64>,
    /// Trailing stops in force from the previous bar.
    pub long_stop: Option<f64>,
    pub short_stop: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackState {
    pub position_open: bool,
    pub reference_price: Option<f64>,
    pub pending_entry: bool,
}

/// One side of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakoutTrack {
    pub side: Side,
    pub threshold: f64,
    pub state: TrackState,
}

impl BreakoutTrack {
    pub fn new(side: Side, threshold: f64) -> Self {
        BreakoutTrack {
            side,
            threshold,
            state: TrackState::default(),
        }
    }

    /// Apply one bar. `trend` is the level the close must also clear to
    /// test a breakout; `None` skips the test. Returns whether the track is
    /// open after the bar.
    pub fn step(&mut self, ctx: &BarContext<'_>, ema: f64, trend: Option<f64>) -> bool {
        let close = ctx.bar.close;
        let (own_fractal, opposite_fractal, stop) = match self.side {
            Side::Long => (ctx.high_fractal, ctx.low_fractal, ctx.long_stop),
            Side::Short => (ctx.low_fractal, ctx.high_fractal, ctx.short_stop),
        };
        let state = &mut self.state;

        if opposite_fractal.is_some() {
            state.reference_price = None;
            state.pending_entry = false;
        }

        if let Some(level) = own_fractal {
            if self.side.favours(close, ema) {
                state.reference_price = Some(level);
                state.pending_entry = false;
            }
        }

        if !state.position_open && state.pending_entry {
            state.position_open = true;
            state.pending_entry = false;
        } else if !state.position_open {
            if let (Some(reference), Some(trend)) = (state.reference_price, trend) {
                if self.side.favours(close, ema) && self.side.favours(close, trend) {
                    let body = ctx.bar.body();
                    let beyond = match self.side {
                        Side::Long => ctx.bar.body_above(reference),
                        Side::Short => ctx.bar.body_below(reference),
                    };
                    if body > 0.0 && beyond >= self.threshold * body {
                        state.pending_entry = true;
                    }
                }
            }
        } else {
            let against = self.side.opposite();
            if against.favours(close, ema) || stop.is_some_and(|level| against.favours(close, level)) {
                state.position_open = false;
            }
        }

        state.position_open
    }
}

/// Long and short tracks folded together.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakoutEngine {
    pub long: BreakoutTrack,
    pub short: BreakoutTrack,
    trend_filter: bool,
}

impl BreakoutEngine {
    pub fn new(params: &SignalParams) -> Self {
        BreakoutEngine {
            long: BreakoutTrack::new(Side::Long, params.breakout_threshold),
            short: BreakoutTrack::new(Side::Short, params.breakout_threshold),
            trend_filter: params.trend_ema_period.is_some(),
        }
    }

    pub fn position(&self) -> Position {
        combine_positions(self.long.state.position_open, self.short.state.position_open)
    }

    /// Bars without an EMA value leave both tracks untouched.
    pub fn step(&mut self, ctx: &BarContext<'_>) -> Position {
        let Some(ema) = ctx.ema else {
            return self.position();
        };
        let trend = if self.trend_filter { ctx.trend_ema } else { Some(ema) };
        let long_open = self.long.step(ctx, ema, trend);
        let short_open = self.short.step(ctx, ema, trend);
        combine_positions(long_open, short_open)
    }
}

/// Positions plus the indicator series that produced them.
#[derive(Debug, Clone)]
pub struct SignalOutput {
    pub positions: Vec<Position>,
    pub ema: IndicatorSeries,
    pub trend_ema: Option<IndicatorSeries>,
    pub fractals: FractalSeries,
    pub trailing_stops: Option<Vec<TrailingStopPoint>>,
}

/// Run the engine over a complete history.
pub fn generate_positions(bars: &[Bar], params: &SignalParams) -> Result<SignalOutput, FractalTraderError> {
    params.validate()?;
    validate_bars(bars)?;

    let ema = calculate_ema_series_lenient(bars, params.ema_period)?;
    let trend_ema = params
        .trend_ema_period
        .map(|period| calculate_ema_series_lenient(bars, period))
        .transpose()?;
    let fractals = match params.fractal_mode {
        FractalMode::Centered => detect_fractals(bars, params.fractal_window)?,
        FractalMode::Causal => detect_fractals_causal(bars, params.fractal_window)?,
    };
    let trailing_stops = params
        .trailing_stop
        .map(|config| williams_trailing_stops(bars, &fractals, config))
        .transpose()?;

    let mut engine = BreakoutEngine::new(params);
    let mut positions = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let prev_stop = i
            .checked_sub(1)
            .and_then(|p| trailing_stops.as_ref().map(|stops| stops[p]))
            .unwrap_or_default();
        let ctx = BarContext {
            bar,
            ema: ema.value_at(i),
            trend_ema: trend_ema.as_ref().and_then(|series| series.value_at(i)),
            high_fractal: fractals.high_at(i),
            low_fractal: fractals.low_at(i),
            long_stop: prev_stop.long_stop,
            short_stop: prev_stop.short_stop,
        };
        positions.push(engine.step(&ctx));
    }

    tracing::debug!(
        bars = bars.len(),
        warmup = ema.warmup(),
        fractals = fractals.points().len(),
        "signal generation complete"
    );

    Ok(SignalOutput {
        positions,
        ema,
        trend_ema,
        fractals,
        trailing_stops,
    })
}

/// Bar-by-bar engine for live feeds. Uses the causal fractal detector
/// regardless of `params.fractal_mode`, so its decisions match a batch run
/// in [`FractalMode::Causal`].
#[derive(Debug, Clone)]
pub struct LiveBreakoutEngine {
    ema: EmaState,
    trend_ema: Option<EmaState>,
    fractals: StreamingFractalDetector,
    stops: Option<TrailingStopTracker>,
    engine: BreakoutEngine,
    last_timestamp: Option<NaiveDateTime>,
    bars_seen: usize,
}

impl LiveBreakoutEngine {
    pub fn new(params: &SignalParams) -> Result<Self, FractalTraderError> {
        params.validate()?;
        Ok(LiveBreakoutEngine {
            ema: EmaState::new(params.ema_period)?,
            trend_ema: params.trend_ema_period.map(EmaState::new).transpose()?,
            fractals: StreamingFractalDetector::new(params.fractal_window)?,
            stops: params.trailing_stop.map(TrailingStopTracker::new).transpose()?,
            engine: BreakoutEngine::new(params),
            last_timestamp: None,
            bars_seen: 0,
        })
    }

    pub fn position(&self) -> Position {
        self.engine.position()
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn push(&mut self, bar: &Bar) -> Result<Position, FractalTraderError> {
        if self.last_timestamp.is_some_and(|last| bar.timestamp <= last) {
            return Err(FractalTraderError::UnorderedBars {
                index: self.bars_seen,
            });
        }
        self.last_timestamp = Some(bar.timestamp);
        self.bars_seen += 1;

        let ema = self.ema.update(bar.close);
        let trend_ema = self.trend_ema.as_mut().and_then(|state| state.update(bar.close));
        let confirmed = self.fractals.push(bar);
        let high_fractal = confirmed.high.map(|p| p.price);
        let low_fractal = confirmed.low.map(|p| p.price);

        let prev_stop = match self.stops.as_mut() {
            Some(tracker) => {
                let prev = tracker.current();
                tracker.update(bar, high_fractal, low_fractal);
                prev
            }
            None => TrailingStopPoint::default(),
        };

        let ctx = BarContext {
            bar,
            ema,
            trend_ema,
            high_fractal,
            low_fractal,
            long_stop: prev_stop.long_stop,
            short_stop: prev_stop.short_stop,
        };
        let position = self.engine.step(&ctx);
        if let Some(side) = position.side() {
            tracing::trace!(timestamp = %bar.timestamp, %side, "position held");
        }
        Ok(position)
    }
}
