//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Each window is summed independently, so a
//! value depends only on its own n closes and not on how much history
//! precedes it. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i + 1 < period {
                IndicatorPoint {
                    timestamp: bar.timestamp,
                    valid: false,
                    value: IndicatorValue::Simple(0.0),
                }
            } else {
                let window = &bars[i + 1 - period..=i];
                let mean = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
                IndicatorPoint {
                    timestamp: bar.timestamp,
                    valid: true,
                    value: IndicatorValue::Simple(mean),
                }
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::bars_from_closes;

    #[test]
    fn sma_warmup_and_values() {
        let bars = bars_from_closes(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_sma(&bars, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert_eq!(series.simple_at(2), Some(20.0));
        assert_eq!(series.simple_at(3), Some(30.0));
    }

    #[test]
    fn sma_is_independent_of_prefix() {
        let long = bars_from_closes(&[5.0, 7.0, 11.0, 13.0, 17.0, 19.0]);
        let full = calculate_sma(&long, 3);
        let tail = calculate_sma(&long[2..], 3);
        assert_eq!(full.simple_at(5), tail.simple_at(3));
    }

    #[test]
    fn sma_period_0() {
        let bars = bars_from_closes(&[10.0, 20.0]);
        assert!(calculate_sma(&bars, 0).values.is_empty());
    }
}
