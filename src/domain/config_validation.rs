//! Builds validated parameter structs from a [`ConfigPort`].
//!
//! Missing keys fall back to the `Default` of each struct. Values that are
//! present but malformed or out of range fail with `ConfigInvalid` naming
//! the offending key. Unrecognised keys are logged and otherwise ignored.

use std::str::FromStr;

use crate::domain::analytics::{AnalyticsConfig, AnnualizationBasis};
use crate::domain::backtest::BacktestConfig;
use crate::domain::error::FractalTraderError;
use crate::domain::indicator::fractal::{FractalMode, FractalWindow};
use crate::domain::indicator::trailing_stop::{FlipOn, TrailingStopConfig};
use crate::domain::signal::SignalParams;
use crate::domain::simulator::{CommissionPolicy, SimulationConfig};
use crate::ports::config_port::ConfigPort;

const STRATEGY: &str = "strategy";
const BACKTEST: &str = "backtest";
const ANALYTICS: &str = "analytics";

const KNOWN_KEYS: [(&str, &[&str]); 3] = [
    (
        STRATEGY,
        &[
            "ema_period",
            "trend_ema_period",
            "fractal_left",
            "fractal_right",
            "fractal_mode",
            "breakout_threshold",
            "trailing_stop",
            "buffer_percent",
            "flip_on",
        ],
    ),
    (
        BACKTEST,
        &[
            "data_path",
            "initial_capital",
            "commission_rate",
            "position_size",
            "commission_policy",
        ],
    ),
    (ANALYTICS, &["risk_free_rate", "bars_per_day"]),
];

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> FractalTraderError {
    FractalTraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Re-tag a parameter error with the config section it came from.
fn in_section(section: &'static str) -> impl Fn(FractalTraderError) -> FractalTraderError {
    move |err| match err {
        FractalTraderError::InvalidParameter { name, reason } => invalid(section, &name, reason),
        other => other,
    }
}

fn parse_optional<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, FractalTraderError> {
    match config.get_optional_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", raw))),
    }
}

fn parse_or<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, FractalTraderError> {
    Ok(parse_optional(config, section, key)?.unwrap_or(default))
}

fn parse_flag(config: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, FractalTraderError> {
    let Some(raw) = config.get_optional_string(section, key) else {
        return Ok(default);
    };
    match raw.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, format!("expected a boolean, got '{}'", raw))),
    }
}

fn parse_choice<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
    choices: &[(&str, T)],
) -> Result<T, FractalTraderError>
where
    T: Copy,
{
    let Some(raw) = config.get_optional_string(section, key) else {
        return Ok(default);
    };
    let wanted = raw.to_lowercase();
    choices
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|&(_, value)| value)
        .ok_or_else(|| {
            let names: Vec<&str> = choices.iter().map(|(name, _)| *name).collect();
            invalid(section, key, format!("expected one of {}, got '{}'", names.join("|"), raw))
        })
}

pub fn build_signal_params(config: &dyn ConfigPort) -> Result<SignalParams, FractalTraderError> {
    let defaults = SignalParams::default();
    let window_defaults = FractalWindow::default();

    let trailing_stop = if parse_flag(config, STRATEGY, "trailing_stop", false)? {
        Some(TrailingStopConfig {
            buffer_percent: parse_or(config, STRATEGY, "buffer_percent", 0.0)?,
            flip_on: parse_choice(
                config,
                STRATEGY,
                "flip_on",
                FlipOn::Close,
                &[("close", FlipOn::Close), ("wick", FlipOn::Wick)],
            )?,
        })
    } else {
        None
    };

    let params = SignalParams {
        ema_period: parse_or(config, STRATEGY, "ema_period", defaults.ema_period)?,
        trend_ema_period: parse_optional(config, STRATEGY, "trend_ema_period")?,
        fractal_window: FractalWindow::new(
            parse_or(config, STRATEGY, "fractal_left", window_defaults.left)?,
            parse_or(config, STRATEGY, "fractal_right", window_defaults.right)?,
        )
        .map_err(in_section(STRATEGY))?,
        fractal_mode: parse_choice(
            config,
            STRATEGY,
            "fractal_mode",
            FractalMode::Centered,
            &[("centered", FractalMode::Centered), ("causal", FractalMode::Causal)],
        )?,
        breakout_threshold: parse_or(config, STRATEGY, "breakout_threshold", defaults.breakout_threshold)?,
        trailing_stop,
    };
    params.validate().map_err(in_section(STRATEGY))?;
    Ok(params)
}

pub fn build_simulation_config(config: &dyn ConfigPort) -> Result<SimulationConfig, FractalTraderError> {
    let defaults = SimulationConfig::default();
    let simulation = SimulationConfig {
        initial_capital: parse_or(config, BACKTEST, "initial_capital", defaults.initial_capital)?,
        commission_rate: parse_or(config, BACKTEST, "commission_rate", defaults.commission_rate)?,
        position_size: parse_or(config, BACKTEST, "position_size", defaults.position_size)?,
        commission_policy: parse_choice(
            config,
            BACKTEST,
            "commission_policy",
            CommissionPolicy::ExitOnly,
            &[
                ("exit_only", CommissionPolicy::ExitOnly),
                ("round_trip", CommissionPolicy::RoundTrip),
            ],
        )?,
    };
    simulation.validate().map_err(in_section(BACKTEST))?;
    Ok(simulation)
}

pub fn build_analytics_config(config: &dyn ConfigPort) -> Result<AnalyticsConfig, FractalTraderError> {
    let defaults = AnalyticsConfig::default();
    let analytics = AnalyticsConfig {
        risk_free_rate: parse_or(config, ANALYTICS, "risk_free_rate", defaults.risk_free_rate)?,
        annualization: match parse_optional::<f64>(config, ANALYTICS, "bars_per_day")? {
            Some(bars) => AnnualizationBasis::BarsPerDay(bars),
            None => AnnualizationBasis::WallClock,
        },
    };
    analytics.validate().map_err(in_section(ANALYTICS))?;
    Ok(analytics)
}

/// Keys in the known sections that no builder reads, as `section.key`.
pub fn unknown_keys(config: &dyn ConfigPort) -> Vec<String> {
    let mut unknown: Vec<String> = KNOWN_KEYS
        .iter()
        .flat_map(|&(section, known)| {
            config
                .keys(section)
                .into_iter()
                .filter(move |key| !known.contains(&key.as_str()))
                .map(move |key| format!("{}.{}", section, key))
        })
        .collect();
    unknown.sort();
    unknown
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, FractalTraderError> {
    for key in unknown_keys(config) {
        tracing::warn!(%key, "ignoring unknown config key");
    }
    Ok(BacktestConfig {
        signal: build_signal_params(config)?,
        simulation: build_simulation_config(config)?,
        analytics: build_analytics_config(config)?,
    })
}
