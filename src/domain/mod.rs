//! Core domain types and logic.

pub mod ohlcv;
pub mod position;
pub mod indicator;
pub mod signal;
pub mod simulator;
pub mod analytics;
pub mod backtest;
pub mod config_validation;
pub mod error;
