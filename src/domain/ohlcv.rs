//! OHLCV bar representation and input-boundary validation.

use chrono::NaiveDateTime;

use crate::domain::error::AdaptraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    fn check(&self) -> Result<(), String> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{name} is not a finite number"));
            }
            if value <= 0.0 {
                return Err(format!("{name} must be positive, got {value}"));
            }
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(format!("volume must be finite and non-negative, got {}", self.volume));
        }
        if self.high < self.low {
            return Err(format!("high {} is below low {}", self.high, self.low));
        }
        Ok(())
    }
}

/// Reject malformed bars before they reach any scoring logic.
///
/// Every OHLC value must be finite and positive, volume finite and
/// non-negative, `high >= low`, and timestamps non-decreasing.
pub fn validate_bars(bars: &[OhlcvBar]) -> Result<(), AdaptraderError> {
    for (index, bar) in bars.iter().enumerate() {
        bar.check()
            .map_err(|reason| AdaptraderError::InvalidInput { index, reason })?;
        if index > 0 && bar.timestamp < bars[index - 1].timestamp {
            return Err(AdaptraderError::InvalidInput {
                index,
                reason: format!(
                    "timestamp {} precedes previous bar {}",
                    bar.timestamp,
                    bars[index - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}

/// Ordered, append-only bar sequence for one instrument and timeframe.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from already-ordered bars, validating all of them.
    pub fn from_bars(bars: Vec<OhlcvBar>) -> Result<Self, AdaptraderError> {
        validate_bars(&bars)?;
        Ok(Self { bars })
    }

    pub fn push(&mut self, bar: OhlcvBar) -> Result<(), AdaptraderError> {
        let index = self.bars.len();
        bar.check()
            .map_err(|reason| AdaptraderError::InvalidInput { index, reason })?;
        if let Some(last) = self.bars.last() {
            if bar.timestamp < last.timestamp {
                return Err(AdaptraderError::InvalidInput {
                    index,
                    reason: format!("timestamp {} precedes {}", bar.timestamp, last.timestamp),
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }
}

/// Hourly bars with open=high=low=close and constant volume, starting 2024-01-01 00:00.
#[cfg(test)]
pub(crate) fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    let points: Vec<(f64, f64)> = closes.iter().map(|&c| (c, 1000.0)).collect();
    bars_with_volume(&points)
}

/// Like [`bars_from_closes`] with an explicit `(close, volume)` per bar.
#[cfg(test)]
pub(crate) fn bars_with_volume(points: &[(f64, f64)]) -> Vec<OhlcvBar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    points
        .iter()
        .enumerate()
        .map(|(i, &(close, volume))| OhlcvBar {
            timestamp: start + chrono::Duration::hours(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar {
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn validate_accepts_clean_bars() {
        let bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        assert!(validate_bars(&bars).is_ok());
    }

    #[test]
    fn validate_rejects_nan_close() {
        let mut bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        bars[1].close = f64::NAN;
        match validate_bars(&bars) {
            Err(AdaptraderError::InvalidInput { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("close"));
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut bar = sample_bar();
        bar.high = 80.0;
        assert!(validate_bars(&[bar]).is_err());
    }

    #[test]
    fn validate_rejects_out_of_order_timestamps() {
        let mut bars = bars_from_closes(&[100.0, 101.0]);
        bars.swap(0, 1);
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn price_series_push_rejects_bad_bar_and_keeps_state() {
        let mut series = PriceSeries::from_bars(bars_from_closes(&[100.0, 101.0])).unwrap();
        let mut bad = series.last().unwrap().clone();
        bad.timestamp += chrono::Duration::hours(1);
        bad.open = f64::INFINITY;
        assert!(series.push(bad).is_err());
        assert_eq!(series.len(), 2);

        let mut good = series.last().unwrap().clone();
        good.timestamp += chrono::Duration::hours(1);
        series.push(good).unwrap();
        assert_eq!(series.len(), 3);
    }
}
