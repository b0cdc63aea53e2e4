//! Closed trade records and the validated, append-only trade history.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::AdaptraderError;
use crate::domain::regime::MarketRegime;

/// Any numeric field beyond this magnitude is treated as corrupt.
pub const MAX_ABS_VALUE: f64 = 1e8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "Take Profit Hit")]
    TakeProfit,
    #[serde(rename = "Stop Loss Hit")]
    StopLoss,
    #[serde(rename = "Momentum Loss")]
    MomentumLoss,
    #[serde(rename = "Signal Reversal")]
    SignalReversal,
    #[serde(rename = "Manual")]
    Manual,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExitReason::TakeProfit => "Take Profit Hit",
            ExitReason::StopLoss => "Stop Loss Hit",
            ExitReason::MomentumLoss => "Momentum Loss",
            ExitReason::SignalReversal => "Signal Reversal",
            ExitReason::Manual => "Manual",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry_index: usize,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub exit_reason: ExitReason,
    pub take_profit_percent: f64,
    pub stop_loss_percent: f64,
    pub signal_confidence: f64,
    pub market_regime: MarketRegime,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }

    /// Check every field for corruption before the record enters a history.
    pub fn validate(&self) -> Result<(), AdaptraderError> {
        let fail = |reason: String| AdaptraderError::InvalidTrade {
            symbol: self.symbol.clone(),
            reason,
        };

        if self.symbol.trim().is_empty() {
            return Err(fail("symbol is empty".into()));
        }

        let numeric = [
            ("entry_price", self.entry_price),
            ("exit_price", self.exit_price),
            ("quantity", self.quantity),
            ("pnl", self.pnl),
            ("pnl_percent", self.pnl_percent),
            ("take_profit_percent", self.take_profit_percent),
            ("stop_loss_percent", self.stop_loss_percent),
            ("signal_confidence", self.signal_confidence),
        ];
        for (name, value) in numeric {
            if !value.is_finite() {
                return Err(fail(format!("{name} is not a finite number")));
            }
            if value.abs() > MAX_ABS_VALUE {
                return Err(fail(format!("{name} magnitude {value} exceeds {MAX_ABS_VALUE}")));
            }
        }

        if self.entry_price <= 0.0 || self.exit_price <= 0.0 {
            return Err(fail("prices must be positive".into()));
        }
        if self.quantity <= 0.0 {
            return Err(fail("quantity must be positive".into()));
        }
        if self.exit_index < self.entry_index {
            return Err(fail(format!(
                "exit index {} precedes entry index {}",
                self.exit_index, self.entry_index
            )));
        }
        if !(0.0..=1.0).contains(&self.signal_confidence) {
            return Err(fail(format!(
                "signal confidence {} outside [0, 1]",
                self.signal_confidence
            )));
        }
        Ok(())
    }
}

/// Append-only, validated trade list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeHistory {
    trades: Vec<TradeRecord>,
}

impl TradeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append. An invalid record leaves the history untouched.
    pub fn append(&mut self, record: TradeRecord) -> Result<(), AdaptraderError> {
        record.validate()?;
        self.trades.push(record);
        Ok(())
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// The most recent `n` trades, oldest first.
    pub fn recent(&self, n: usize) -> &[TradeRecord] {
        &self.trades[self.trades.len().saturating_sub(n)..]
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

/// A valid BTC/USD record with the given P&L.
#[cfg(test)]
pub(crate) fn trade_with_pnl(pnl: f64) -> TradeRecord {
    let entry_price = 100.0;
    let quantity = 1.0;
    TradeRecord {
        symbol: "BTC/USD".into(),
        entry_index: 1,
        entry_price,
        exit_index: 2,
        exit_price: entry_price + pnl / quantity,
        quantity,
        pnl,
        pnl_percent: pnl / entry_price * 100.0,
        exit_reason: if pnl >= 0.0 {
            ExitReason::TakeProfit
        } else {
            ExitReason::StopLoss
        },
        take_profit_percent: 2.0,
        stop_loss_percent: 1.0,
        signal_confidence: 0.7,
        market_regime: MarketRegime::Trending,
    }
}
