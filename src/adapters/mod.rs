//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_trade_log;
pub mod file_config_adapter;
pub mod fixed_signal_adapter;
