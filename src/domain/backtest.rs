//! Historical replay of a long-only momentum strategy for one candidate
//! parameter set.
//!
//! The loop is a two-state machine (flat / long) stepping once per bar from
//! [`WARMUP_BARS`]. Entries are deliberately indicator-light so the
//! optimizer can run many candidates quickly; sizing and exits come from
//! [`crate::domain::sizing`].

use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};

use super::indicator::calculate_rsi;
use super::metrics::{EquityPoint, PerformanceMetrics};
use super::ohlcv::OhlcvBar;
use super::regime::{classify_regime, MarketRegime};
use super::sizing::{compute_exit_levels, size_position, trade_stats};
use super::trade::{ExitReason, TradeHistory, TradeRecord};

/// Index of the first bar the state machine evaluates.
pub const WARMUP_BARS: usize = 21;
pub const MIN_BACKTEST_BARS: usize = WARMUP_BARS + 1;

pub const BASE_LENGTH_RANGE: Range<usize> = 10..30;
pub const EVAL_PERIOD_RANGE: Range<usize> = 10..20;
pub const RSI_OVERSOLD_RANGE: Range<f64> = 20.0..35.0;
pub const RSI_OVERBOUGHT_RANGE: Range<f64> = 65.0..80.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    pub initial_capital: f64,
    /// Annual rate; divided by 252 for the per-bar Sharpe excess.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            symbol: "BTC/USD".to_string(),
            initial_capital: 10_000.0,
            risk_free_rate: 0.0,
        }
    }
}

/// One point in the optimizer's search space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateParams {
    /// RSI period and volatility/regime lookback.
    pub base_length: usize,
    /// Number of local trades feeding sizing statistics.
    pub eval_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for CandidateParams {
    fn default() -> Self {
        CandidateParams {
            base_length: 14,
            eval_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

#[derive(Debug, Clone)]
struct OpenPosition {
    entry_index: usize,
    entry_price: f64,
    quantity: f64,
    take_profit_percent: f64,
    stop_loss_percent: f64,
    confidence: f64,
    regime: MarketRegime,
}

impl OpenPosition {
    /// First matching exit on `bars[i]`: take profit, then stop loss, then momentum loss.
    fn exit_on(&self, bar: &OhlcvBar, prev_close: f64) -> Option<(ExitReason, f64)> {
        let entry = self.entry_price;
        if (bar.high - entry) / entry * 100.0 >= self.take_profit_percent {
            Some((
                ExitReason::TakeProfit,
                entry * (1.0 + self.take_profit_percent / 100.0),
            ))
        } else if (bar.low - entry) / entry * 100.0 <= -self.stop_loss_percent {
            Some((
                ExitReason::StopLoss,
                entry * (1.0 - self.stop_loss_percent / 100.0),
            ))
        } else if bar.close < prev_close && bar.close < entry {
            Some((ExitReason::MomentumLoss, bar.close))
        } else {
            None
        }
    }
}

pub fn run_backtest(
    bars: &[OhlcvBar],
    candidate: &CandidateParams,
    config: &BacktestConfig,
) -> BacktestResult {
    if bars.len() < MIN_BACKTEST_BARS {
        debug!(bars = bars.len(), "too few bars to backtest");
        return BacktestResult {
            metrics: PerformanceMetrics::from_run(
                &[],
                &[],
                config.initial_capital,
                config.risk_free_rate,
            ),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        };
    }

    let rsi = calculate_rsi(bars, candidate.base_length);
    let mut cash = config.initial_capital;
    let mut position: Option<OpenPosition> = None;
    let mut history = TradeHistory::new();
    let mut equity_curve = Vec::with_capacity(bars.len() - WARMUP_BARS);

    for i in WARMUP_BARS..bars.len() {
        let bar = &bars[i];
        let prev_close = bars[i - 1].close;
        let mut closed_this_bar = false;

        if let Some(pos) = &position {
            if let Some((reason, exit_price)) = pos.exit_on(bar, prev_close) {
                cash += pos.quantity * exit_price;
                let pnl = (exit_price - pos.entry_price) * pos.quantity;
                let record = TradeRecord {
                    symbol: config.symbol.clone(),
                    entry_index: pos.entry_index,
                    entry_price: pos.entry_price,
                    exit_index: i,
                    exit_price,
                    quantity: pos.quantity,
                    pnl,
                    pnl_percent: (exit_price - pos.entry_price) / pos.entry_price * 100.0,
                    exit_reason: reason,
                    take_profit_percent: pos.take_profit_percent,
                    stop_loss_percent: pos.stop_loss_percent,
                    signal_confidence: pos.confidence,
                    market_regime: pos.regime,
                };
                if let Err(e) = history.append(record) {
                    warn!(error = %e, index = i, "dropping invalid backtest trade");
                }
                position = None;
                closed_this_bar = true;
            }
        }

        if position.is_none() && !closed_this_bar && bar.close > prev_close {
            let rsi_ok = rsi
                .simple_at(i)
                .is_none_or(|r| r > candidate.rsi_oversold && r < candidate.rsi_overbought);
            if rsi_ok {
                position = open_position(bars, i, candidate, cash, &history);
                if let Some(pos) = &position {
                    cash -= pos.quantity * pos.entry_price;
                }
            }
        }

        let marked = position
            .as_ref()
            .map_or(0.0, |p| p.quantity * bar.close);
        equity_curve.push(EquityPoint {
            index: i,
            timestamp: bar.timestamp,
            equity: cash + marked,
        });
    }

    let trades = history.trades().to_vec();
    let metrics = PerformanceMetrics::from_run(
        &trades,
        &equity_curve,
        config.initial_capital,
        config.risk_free_rate,
    );
    BacktestResult {
        metrics,
        trades,
        equity_curve,
    }
}

fn open_position(
    bars: &[OhlcvBar],
    i: usize,
    candidate: &CandidateParams,
    cash: f64,
    history: &TradeHistory,
) -> Option<OpenPosition> {
    let price = bars[i].close;
    let window = &bars[(i + 1).saturating_sub(candidate.base_length)..=i];
    let stats = trade_stats(history.trades(), candidate.eval_period);
    let regime = classify_regime(window, candidate.base_length);

    let sizing = size_position(
        cash,
        price,
        stats.win_rate,
        stats.avg_win,
        stats.avg_loss,
        history.recent(candidate.eval_period),
    );
    if sizing.quantity * price > cash {
        debug!(index = i, cash, "insufficient cash to enter");
        return None;
    }
    let exits = compute_exit_levels(window, price, regime, stats.win_rate);

    Some(OpenPosition {
        entry_index: i,
        entry_price: price,
        quantity: sizing.quantity,
        take_profit_percent: exits.take_profit_percent,
        stop_loss_percent: exits.stop_loss_percent,
        confidence: sizing.confidence,
        regime,
    })
}
