//! Current and previous closed-bar indicator readings for one evaluation.

use crate::domain::adaptive::AdaptiveParameters;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::{calculate_macd, calculate_rsi, calculate_sma};
use crate::domain::ohlcv::OhlcvBar;

pub const VOLUME_AVERAGE_WINDOW: usize = 20;

/// Indicator values at the last bar and the bar before it.
///
/// A `None` means the indicator is still warming up at that bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub ma_fast: Option<f64>,
    pub ma_fast_prev: Option<f64>,
    pub ma_slow: Option<f64>,
    pub ma_slow_prev: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<(f64, f64)>,
    pub macd_prev: Option<(f64, f64)>,
    pub volume: f64,
    /// Mean volume of the last 20 bars, current bar included.
    pub avg_volume: f64,
}

impl IndicatorSnapshot {
    /// `fast - slow` at (previous, current) bar.
    pub fn ma_spread(&self) -> Option<(f64, f64)> {
        Some((
            self.ma_fast_prev? - self.ma_slow_prev?,
            self.ma_fast? - self.ma_slow?,
        ))
    }

    /// `line - signal` at (previous, current) bar.
    pub fn macd_spread(&self) -> Option<(f64, f64)> {
        let (line_prev, signal_prev) = self.macd_prev?;
        let (line, signal) = self.macd?;
        Some((line_prev - signal_prev, line - signal))
    }

    /// Current volume relative to the trailing average; 0 when there is no volume.
    pub fn volume_ratio(&self) -> f64 {
        if self.avg_volume > 0.0 {
            self.volume / self.avg_volume
        } else {
            0.0
        }
    }
}

pub fn compute_snapshot(bars: &[OhlcvBar], params: &AdaptiveParameters) -> IndicatorSnapshot {
    let Some(last) = bars.len().checked_sub(1) else {
        return IndicatorSnapshot::default();
    };
    let prev = last.checked_sub(1);

    let fast = calculate_sma(bars, params.ma_fast_period);
    let slow = calculate_sma(bars, params.ma_slow_period);
    let rsi = calculate_rsi(bars, params.rsi_period);
    let macd = calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

    let volume_window = &bars[bars.len().saturating_sub(VOLUME_AVERAGE_WINDOW)..];
    let avg_volume =
        volume_window.iter().map(|b| b.volume).sum::<f64>() / volume_window.len() as f64;

    IndicatorSnapshot {
        ma_fast: fast.simple_at(last),
        ma_fast_prev: prev.and_then(|p| fast.simple_at(p)),
        ma_slow: slow.simple_at(last),
        ma_slow_prev: prev.and_then(|p| slow.simple_at(p)),
        rsi: rsi.simple_at(last),
        macd: macd.macd_at(last),
        macd_prev: prev.and_then(|p| macd.macd_at(p)),
        volume: bars[last].volume,
        avg_volume,
    }
}
