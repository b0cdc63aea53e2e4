//! Position sizing and exit levels.
//!
//! Quantity comes from a Kelly fraction scaled by the recent win/loss
//! streak, then hard-capped at 10% of the balance. Exit levels start from a
//! regime-specific pair and are adjusted for volatility and recent
//! performance. Neither calculator ever fails: unusable inputs resolve to
//! conservative defaults and are logged.

use tracing::{debug, warn};

use crate::domain::indicator::return_volatility;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::regime::MarketRegime;
use crate::domain::trade::TradeRecord;

pub const MIN_POSITION_SIZE: f64 = 0.0001;
/// Largest share of the balance a single position may take.
pub const MAX_POSITION_FRACTION: f64 = 0.10;
const FALLBACK_RISK_FRACTION: f64 = 0.01;

pub const TAKE_PROFIT_MIN: f64 = 0.5;
pub const TAKE_PROFIT_MAX: f64 = 5.0;
pub const STOP_LOSS_MIN: f64 = 0.3;
pub const STOP_LOSS_MAX: f64 = 3.0;
pub const FALLBACK_TAKE_PROFIT: f64 = 1.0;
pub const FALLBACK_STOP_LOSS: f64 = 2.0;

pub const EXIT_VOLATILITY_WINDOW: usize = 20;
const HIGH_VOLATILITY: f64 = 0.03;
const LOW_VOLATILITY: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSizing {
    pub quantity: f64,
    /// Notional committed: `quantity * price`.
    pub risk_amount: f64,
    /// Kelly fraction after clamping; 0 for a fallback size.
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitLevels {
    pub take_profit_percent: f64,
    pub stop_loss_percent: f64,
    pub reasoning: String,
}

impl ExitLevels {
    pub fn fallback(reason: &str) -> Self {
        ExitLevels {
            take_profit_percent: FALLBACK_TAKE_PROFIT,
            stop_loss_percent: FALLBACK_STOP_LOSS,
            reasoning: format!("Fallback exits: {reason}"),
        }
    }
}

/// Win rate and average win/loss magnitudes over a trade window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeStats {
    pub trades: usize,
    /// wins / (wins + losses); 0.5 when there are no decided trades.
    pub win_rate: f64,
    pub avg_win: f64,
    /// Positive magnitude of the average losing trade.
    pub avg_loss: f64,
}

/// Summarise the most recent `window` trades.
pub fn trade_stats(history: &[TradeRecord], window: usize) -> TradeStats {
    let recent = &history[history.len().saturating_sub(window)..];
    let wins: Vec<f64> = recent.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
    let losses: Vec<f64> = recent.iter().filter(|t| t.is_loss()).map(|t| -t.pnl).collect();

    let mean = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };
    let decided = wins.len() + losses.len();

    TradeStats {
        trades: recent.len(),
        win_rate: if decided > 0 {
            wins.len() as f64 / decided as f64
        } else {
            0.5
        },
        avg_win: mean(&wins),
        avg_loss: mean(&losses),
    }
}

/// Multiplier from the run of identical outcomes at the end of `recent`.
fn streak_multiplier(recent: &[TradeRecord]) -> (f64, Option<String>) {
    let losses = recent.iter().rev().take_while(|t| t.is_loss()).count();
    let wins = recent.iter().rev().take_while(|t| t.is_win()).count();

    if losses >= 3 {
        (0.5, Some(format!("{losses} consecutive losses, size halved")))
    } else if losses >= 2 {
        (0.7, Some(format!("{losses} consecutive losses, size x0.7")))
    } else if wins >= 3 {
        (1.2, Some(format!("{wins} consecutive wins, size x1.2")))
    } else {
        (1.0, None)
    }
}

fn usable(balance: f64, price: f64) -> bool {
    balance.is_finite() && balance > 0.0 && price.is_finite() && price > 0.0
}

fn max_quantity(balance: f64, price: f64) -> f64 {
    (MAX_POSITION_FRACTION * balance / price).max(MIN_POSITION_SIZE)
}

fn fallback_sizing(balance: f64, price: f64, reason: &str) -> PositionSizing {
    if !usable(balance, price) {
        warn!(balance, price, reason, "unusable balance or price, using minimum size");
        let notional = if price.is_finite() && price > 0.0 {
            MIN_POSITION_SIZE * price
        } else {
            0.0
        };
        return PositionSizing {
            quantity: MIN_POSITION_SIZE,
            risk_amount: notional,
            confidence: 0.0,
            reasoning: format!("Minimum size: {reason}"),
        };
    }

    debug!(reason, "position sizing fallback");
    let quantity = (FALLBACK_RISK_FRACTION * balance / price)
        .clamp(MIN_POSITION_SIZE, max_quantity(balance, price));
    PositionSizing {
        quantity,
        risk_amount: quantity * price,
        confidence: 0.0,
        reasoning: format!("Fallback 1% risk: {reason}"),
    }
}

/// Kelly-criterion position size with a streak multiplier and a 10% cap.
pub fn size_position(
    balance: f64,
    price: f64,
    win_rate: f64,
    avg_win: f64,
    avg_loss: f64,
    recent: &[TradeRecord],
) -> PositionSizing {
    if !usable(balance, price) {
        return fallback_sizing(balance, price, "balance and price must be positive");
    }
    if !win_rate.is_finite() || !avg_win.is_finite() || !avg_loss.is_finite() {
        return fallback_sizing(balance, price, "non-finite performance statistics");
    }
    if avg_win <= 0.0 || avg_loss <= 0.0 {
        return fallback_sizing(balance, price, "no win/loss history for Kelly ratio");
    }

    let w = win_rate.clamp(0.0, 1.0);
    let payoff = avg_win / avg_loss;
    let kelly = (w - (1.0 - w) / payoff).clamp(0.0, 1.0);
    let (multiplier, streak_note) = streak_multiplier(recent);

    let cap = max_quantity(balance, price);
    let raw = kelly * balance / price * multiplier;
    let quantity = raw.clamp(MIN_POSITION_SIZE, cap);

    let mut reasoning = format!("Kelly {:.3} (win rate {:.2}, payoff {:.2})", kelly, w, payoff);
    if let Some(note) = streak_note {
        reasoning.push_str("; ");
        reasoning.push_str(&note);
    }
    if raw > cap {
        reasoning.push_str("; capped at 10% of balance");
    } else if raw < MIN_POSITION_SIZE {
        reasoning.push_str("; raised to minimum size");
    }

    PositionSizing {
        quantity,
        risk_amount: quantity * price,
        confidence: kelly,
        reasoning,
    }
}

fn regime_base(regime: MarketRegime) -> (f64, f64) {
    match regime {
        MarketRegime::Trending => (3.0, 1.5),
        MarketRegime::Volatile => (2.0, 2.5),
        MarketRegime::Sideways => (1.5, 1.0),
    }
}

/// Take-profit and stop-loss percentages for a new position.
pub fn compute_exit_levels(
    window: &[OhlcvBar],
    entry_price: f64,
    regime: MarketRegime,
    win_rate: f64,
) -> ExitLevels {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        warn!(entry_price, "invalid entry price, using fallback exits");
        return ExitLevels::fallback("invalid entry price");
    }
    let volatility = return_volatility(window, EXIT_VOLATILITY_WINDOW);
    if !volatility.is_finite() || !win_rate.is_finite() {
        warn!(volatility, win_rate, "non-finite exit inputs, using fallback exits");
        return ExitLevels::fallback("non-finite volatility or win rate");
    }

    let (mut tp, mut sl) = regime_base(regime);
    let mut notes = vec![format!("{regime} base TP {tp:.2}% / SL {sl:.2}%")];

    if volatility > HIGH_VOLATILITY {
        tp *= 0.8;
        sl *= 1.3;
        notes.push(format!("high volatility {:.2}%: tighter TP, wider SL", volatility * 100.0));
    } else if volatility < LOW_VOLATILITY {
        tp *= 1.2;
        sl *= 0.8;
        notes.push(format!("low volatility {:.2}%: wider TP, tighter SL", volatility * 100.0));
    }

    if win_rate < 0.4 {
        tp *= 0.8;
        sl *= 1.2;
        notes.push(format!("weak win rate {win_rate:.2}"));
    } else if win_rate > 0.6 {
        tp *= 1.2;
        sl *= 0.9;
        notes.push(format!("strong win rate {win_rate:.2}"));
    }

    ExitLevels {
        take_profit_percent: tp.clamp(TAKE_PROFIT_MIN, TAKE_PROFIT_MAX),
        stop_loss_percent: sl.clamp(STOP_LOSS_MIN, STOP_LOSS_MAX),
        reasoning: notes.join("; "),
    }
}
