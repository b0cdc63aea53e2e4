//! Adaptive parameter controller.
//!
//! Looks at the most recent trades and nudges the scorer's lookbacks and
//! confidence threshold by one bounded step per call. Steps do not scale with
//! how far the win rate is from target, which bounds oscillation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::trade::TradeRecord;

pub const ADAPT_WINDOW: usize = 20;
pub const MIN_TRADES_TO_ADAPT: usize = 10;

pub const RSI_PERIOD_MIN: usize = 7;
pub const RSI_PERIOD_MAX: usize = 21;
pub const MA_FAST_MAX: usize = 15;
pub const MA_SLOW_MAX: usize = 30;
pub const THRESHOLD_MIN: f64 = 0.4;
pub const THRESHOLD_MAX: f64 = 0.8;
const THRESHOLD_STEP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveParameters {
    pub rsi_period: usize,
    pub ma_fast_period: usize,
    pub ma_slow_period: usize,
    pub confidence_threshold: f64,
}

impl Default for AdaptiveParameters {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ma_fast_period: 10,
            ma_slow_period: 20,
            confidence_threshold: 0.6,
        }
    }
}

impl AdaptiveParameters {
    /// Force every field back inside its documented bounds.
    pub fn clamped(self) -> Self {
        Self {
            rsi_period: self.rsi_period.clamp(RSI_PERIOD_MIN, RSI_PERIOD_MAX),
            ma_fast_period: self.ma_fast_period.clamp(1, MA_FAST_MAX),
            ma_slow_period: self.ma_slow_period.clamp(1, MA_SLOW_MAX),
            confidence_threshold: if self.confidence_threshold.is_finite() {
                self.confidence_threshold.clamp(THRESHOLD_MIN, THRESHOLD_MAX)
            } else {
                Self::default().confidence_threshold
            },
        }
    }

    pub fn within_bounds(&self) -> bool {
        (RSI_PERIOD_MIN..=RSI_PERIOD_MAX).contains(&self.rsi_period)
            && self.ma_fast_period <= MA_FAST_MAX
            && self.ma_slow_period <= MA_SLOW_MAX
            && (THRESHOLD_MIN..=THRESHOLD_MAX).contains(&self.confidence_threshold)
    }
}

/// Sole owner of the mutable [`AdaptiveParameters`].
#[derive(Debug, Clone, Default)]
pub struct AdaptiveController {
    params: AdaptiveParameters,
}

impl AdaptiveController {
    pub fn new(params: AdaptiveParameters) -> Self {
        Self {
            params: params.clamped(),
        }
    }

    pub fn params(&self) -> &AdaptiveParameters {
        &self.params
    }

    /// Apply one adjustment step from the trailing trade window.
    ///
    /// No-op when fewer than [`MIN_TRADES_TO_ADAPT`] trades exist.
    pub fn adapt(&mut self, history: &[TradeRecord]) -> &AdaptiveParameters {
        if history.len() < MIN_TRADES_TO_ADAPT {
            debug!(trades = history.len(), "too few trades to adapt");
            return &self.params;
        }

        let window = &history[history.len().saturating_sub(ADAPT_WINDOW)..];
        let wins = window.iter().filter(|t| t.pnl > 0.0).count();
        let win_rate = wins as f64 / window.len() as f64;
        let p = &mut self.params;

        if win_rate < 0.4 {
            p.rsi_period = (p.rsi_period + 1).min(RSI_PERIOD_MAX);
            p.ma_fast_period = (p.ma_fast_period + 1).min(MA_FAST_MAX);
            p.ma_slow_period = (p.ma_slow_period + 2).min(MA_SLOW_MAX);
        } else if win_rate > 0.6 {
            p.rsi_period = p.rsi_period.saturating_sub(1).max(RSI_PERIOD_MIN);
        }

        if win_rate < 0.3 {
            p.confidence_threshold = (p.confidence_threshold + THRESHOLD_STEP).min(THRESHOLD_MAX);
        } else if win_rate > 0.7 {
            p.confidence_threshold = (p.confidence_threshold - THRESHOLD_STEP).max(THRESHOLD_MIN);
        }

        debug!(
            win_rate,
            rsi_period = p.rsi_period,
            ma_fast = p.ma_fast_period,
            ma_slow = p.ma_slow_period,
            threshold = p.confidence_threshold,
            "adapted parameters"
        );
        &self.params
    }
}
