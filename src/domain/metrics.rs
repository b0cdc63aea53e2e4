//! Performance metrics over a trade list and its equity curve.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::trade::TradeRecord;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Account value at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_pnl: f64,
    pub total_return: f64,
    /// wins / (wins + losses); breakeven trades are excluded.
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    /// Largest peak-to-trough fall in account currency.
    pub max_drawdown: f64,
    /// The same fall as a percentage of the peak it started from (25.0 = 25%).
    pub max_drawdown_percent: f64,
    pub sharpe_ratio: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl PerformanceMetrics {
    /// Metrics for a backtest with a bar-level equity curve.
    pub fn from_run(
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        Self::compute(trades, &equity, initial_capital, risk_free_rate)
    }

    /// Metrics for a bare trade list; equity steps once per closed trade.
    pub fn from_trades(trades: &[TradeRecord], initial_capital: f64, risk_free_rate: f64) -> Self {
        let mut equity = Vec::with_capacity(trades.len() + 1);
        equity.push(initial_capital);
        let mut running = initial_capital;
        for trade in trades {
            running += trade.pnl;
            equity.push(running);
        }
        Self::compute(trades, &equity, initial_capital, risk_free_rate)
    }

    fn compute(
        trades: &[TradeRecord],
        equity: &[f64],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                wins += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losses += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
        }

        let decided = wins + losses;
        let win_rate = if decided > 0 {
            wins as f64 / decided as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let final_equity = equity.last().copied().unwrap_or(initial_capital);
        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_percent) = compute_drawdown(equity);
        let sharpe_ratio = compute_sharpe(equity, risk_free_rate / TRADING_DAYS_PER_YEAR);

        PerformanceMetrics {
            total_trades: trades.len(),
            wins,
            losses,
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            total_return,
            win_rate,
            avg_win: if wins > 0 { total_wins / wins as f64 } else { 0.0 },
            avg_loss: if losses > 0 {
                total_losses / losses as f64
            } else {
                0.0
            },
            profit_factor,
            max_drawdown,
            max_drawdown_percent,
            sharpe_ratio,
            largest_win,
            largest_loss,
        }
    }
}

/// (absolute, percent-of-peak) maximum drawdown.
fn compute_drawdown(equity: &[f64]) -> (f64, f64) {
    let Some(&first) = equity.first() else {
        return (0.0, 0.0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_pct = 0.0_f64;

    for &value in equity {
        if value > peak {
            peak = value;
            continue;
        }
        let dd = peak - value;
        if dd > max_dd {
            max_dd = dd;
            max_dd_pct = if peak > 0.0 { dd / peak * 100.0 } else { 0.0 };
        }
    }

    (max_dd, max_dd_pct)
}

/// Annualised Sharpe ratio of per-step returns; 0 when returns do not vary.
fn compute_sharpe(equity: &[f64], daily_rf: f64) -> f64 {
    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    if returns.is_empty() {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        (mean - daily_rf) / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::trade_with_pnl;
    use approx::assert_relative_eq;

    #[test]
    fn empty_trade_list() {
        let m = PerformanceMetrics::from_trades(&[], 10_000.0, 0.0);
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.profit_factor, 0.0);
    }

    #[test]
    fn trade_statistics() {
        let trades: Vec<_> = [100.0, -50.0, 200.0, 0.0, -25.0]
            .iter()
            .map(|&p| trade_with_pnl(p))
            .collect();
        let m = PerformanceMetrics::from_trades(&trades, 10_000.0, 0.0);
        assert_eq!(m.total_trades, 5);
        assert_eq!(m.wins, 2);
        assert_eq!(m.losses, 2);
        assert_relative_eq!(m.win_rate, 0.5);
        assert_relative_eq!(m.total_pnl, 225.0);
        assert_relative_eq!(m.total_return, 0.0225);
        assert_relative_eq!(m.avg_win, 150.0);
        assert_relative_eq!(m.avg_loss, 37.5);
        assert_relative_eq!(m.profit_factor, 4.0);
        assert_relative_eq!(m.largest_win, 200.0);
        assert_relative_eq!(m.largest_loss, 50.0);
    }

    #[test]
    fn only_winners_have_infinite_profit_factor() {
        let m = PerformanceMetrics::from_trades(&[trade_with_pnl(10.0)], 1000.0, 0.0);
        assert!(m.profit_factor.is_infinite());
    }

    #[test]
    fn drawdown_tracks_running_peak() {
        let (abs, pct) = compute_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert_relative_eq!(abs, 30.0);
        assert_relative_eq!(pct, 25.0);
    }

    #[test]
    fn drawdown_percent_is_on_percent_scale() {
        let trades = [trade_with_pnl(-2_500.0)];
        let m = PerformanceMetrics::from_trades(&trades, 10_000.0, 0.0);
        assert_relative_eq!(m.max_drawdown, 2_500.0);
        assert_relative_eq!(m.max_drawdown_percent, 25.0);
    }

    #[test]
    fn drawdown_monotonic_increase_is_zero() {
        assert_eq!(compute_drawdown(&[100.0, 101.0, 102.0]), (0.0, 0.0));
    }

    #[test]
    fn sharpe_zero_for_constant_returns() {
        assert_eq!(compute_sharpe(&[100.0, 100.0, 100.0], 0.0), 0.0);
        assert_eq!(compute_sharpe(&[200.0, 400.0, 800.0], 0.0), 0.0);
        assert_eq!(compute_sharpe(&[100.0], 0.0), 0.0);
    }

    #[test]
    fn sharpe_known_value() {
        // returns +10%, -10%: mean 0, population std 0.1
        let sharpe = compute_sharpe(&[100.0, 110.0, 99.0], 0.0);
        assert_relative_eq!(sharpe, 0.0, epsilon = 1e-12);

        // returns +10%, 0%: mean 0.05, std 0.05 => sqrt(252)
        let sharpe = compute_sharpe(&[100.0, 110.0, 110.0], 0.0);
        assert_relative_eq!(sharpe, TRADING_DAYS_PER_YEAR.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn risk_free_rate_lowers_sharpe() {
        let equity = [100.0, 110.0, 110.0];
        let with_rf = compute_sharpe(&equity, 0.05 / TRADING_DAYS_PER_YEAR);
        assert!(with_rf < compute_sharpe(&equity, 0.0));
    }
}
