//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: max(fast, slow) - 1 + signal - 1 bars

use crate::domain::indicator::ema::ema_of;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };

    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_of(&closes, fast);
    let ema_slow = ema_of(&closes, slow);

    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    // The signal EMA starts where the line first becomes defined.
    let line_start = line.iter().position(Option::is_some).unwrap_or(line.len());
    let defined: Vec<f64> = line[line_start..].iter().flatten().copied().collect();
    let mut signal = vec![None; line_start];
    signal.extend(ema_of(&defined, signal_period));

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (valid, l, s) = match (line[i], signal[i]) {
                (Some(l), Some(s)) => (true, l, s),
                (l, _) => (false, l.unwrap_or(0.0), 0.0),
            };
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid,
                value: IndicatorValue::Macd {
                    line: l,
                    signal: s,
                    histogram: l - s,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(bars: &[OhlcvBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::bars_from_closes;
    use approx::assert_abs_diff_eq;

    #[test]
    fn macd_warmup_default() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let series = calculate_macd_default(&bars_from_closes(&closes));

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        assert!(!series.values[warmup - 1].valid);
        assert!(series.values[warmup].valid);
    }

    #[test]
    fn macd_constant_prices_are_zero() {
        let series = calculate_macd(&bars_from_closes(&[50.0; 20]), 3, 5, 3);
        let (line, signal) = series.macd_at(19).unwrap();
        assert_abs_diff_eq!(line, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(signal, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn macd_uptrend_line_positive() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let series = calculate_macd(&bars_from_closes(&closes), 3, 6, 3);
        let (line, _) = series.macd_at(29).unwrap();
        assert!(line > 0.0);
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let series = calculate_macd(&bars_from_closes(&closes), 3, 6, 3);
        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert_abs_diff_eq!(histogram, line - signal, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn macd_zero_period() {
        let series = calculate_macd(&bars_from_closes(&[1.0, 2.0]), 0, 26, 9);
        assert!(series.values.is_empty());
    }
}
