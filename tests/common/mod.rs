#![allow(dead_code)]

use adaptrader::domain::error::AdaptraderError;
use adaptrader::domain::external::ExternalInputs;
pub use adaptrader::domain::ohlcv::OhlcvBar;
use adaptrader::domain::regime::MarketRegime;
use adaptrader::domain::trade::{ExitReason, TradeRecord};
use adaptrader::ports::data_port::DataPort;
use adaptrader::ports::history_port::TradeHistoryPort;
use adaptrader::ports::signal_port::SignalPort;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, AdaptraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(AdaptraderError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

/// Signal collaborator that serves one value or always fails.
pub struct MockSignalPort {
    pub inputs: Option<ExternalInputs>,
}

impl SignalPort for MockSignalPort {
    fn fetch(&self, _symbol: &str) -> Result<ExternalInputs, AdaptraderError> {
        self.inputs.clone().ok_or_else(|| AdaptraderError::ExternalSignal {
            reason: "collaborator offline".into(),
        })
    }
}

/// History store kept in memory; validates on append like the CSV log.
#[derive(Default)]
pub struct MemoryHistory {
    pub trades: RefCell<Vec<TradeRecord>>,
}

impl TradeHistoryPort for MemoryHistory {
    fn load_trades(&self) -> Result<Vec<TradeRecord>, AdaptraderError> {
        Ok(self.trades.borrow().clone())
    }

    fn append_trade(&self, trade: &TradeRecord) -> Result<(), AdaptraderError> {
        trade.validate()?;
        self.trades.borrow_mut().push(trade.clone());
        Ok(())
    }
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(index: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        timestamp: start_time() + Duration::hours(index as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Hourly flat bars (open=high=low=close) with volume 1000.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c, c, c, 1000.0))
        .collect()
}

/// `len` bars alternating 100, 101, 100, ...
pub fn zigzag(len: usize) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..len)
        .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
        .collect();
    bars_from_closes(&closes)
}

pub fn make_trade(pnl: f64) -> TradeRecord {
    TradeRecord {
        symbol: "BTC/USD".into(),
        entry_index: 10,
        entry_price: 100.0,
        exit_index: 12,
        exit_price: 100.0 + pnl,
        quantity: 1.0,
        pnl,
        pnl_percent: pnl,
        exit_reason: if pnl >= 0.0 {
            ExitReason::TakeProfit
        } else {
            ExitReason::StopLoss
        },
        take_profit_percent: 2.0,
        stop_loss_percent: 1.0,
        signal_confidence: 0.6,
        market_regime: MarketRegime::Sideways,
    }
}
