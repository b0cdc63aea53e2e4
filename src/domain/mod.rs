//! Core domain types and logic.

pub mod adaptive;
pub mod backtest;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod external;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod optimizer;
pub mod regime;
pub mod risk;
pub mod signal;
pub mod sizing;
pub mod trade;
