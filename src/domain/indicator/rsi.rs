//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes to seed the averages).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let mut rsi = None;

        if period > 0 && i > 0 {
            let change = bar.close - bars[i - 1].close;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);

            if i <= period {
                avg_gain += gain / period as f64;
                avg_loss += loss / period as f64;
            } else {
                avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
                avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
            }

            if i >= period {
                rsi = Some(if avg_loss == 0.0 {
                    100.0
                } else {
                    100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
                });
            }
        }

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: rsi.is_some(),
            value: IndicatorValue::Simple(rsi.unwrap_or(0.0)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::bars_from_closes;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "bar {} should be invalid", i);
        }
        assert!(series.values[14].valid);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);
        assert_abs_diff_eq!(series.simple_at(14).unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);
        assert_abs_diff_eq!(series.simple_at(14).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn rsi_seed_matches_simple_average() {
        // changes: +2, -1, +2 → avg_gain 4/3, avg_loss 1/3 → RS 4 → RSI 80
        let series = calculate_rsi(&bars_from_closes(&[10.0, 12.0, 11.0, 13.0]), 3);
        assert_abs_diff_eq!(series.simple_at(3).unwrap(), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn rsi_stays_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&bars_from_closes(&closes), 14);
        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Simple(rsi) = point.value {
                assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
            }
        }
    }

    #[test]
    fn rsi_zero_period_is_all_invalid() {
        let series = calculate_rsi(&bars_from_closes(&[100.0, 101.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
