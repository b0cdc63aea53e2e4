//! Dispersion and persistence measures.
//!
//! `return_volatility`: population standard deviation of simple returns over
//! the trailing window, as a fraction (0.02 = 2%).
//!
//! `efficiency_ratio`: |net change| / sum(|bar-to-bar change|) over the
//! trailing window; 1.0 is a straight line, near 0 is directionless chop.

use crate::domain::ohlcv::OhlcvBar;

/// Standard deviation of simple returns across the last `window` bars.
///
/// Returns 0.0 when fewer than two bars are available.
pub fn return_volatility(bars: &[OhlcvBar], window: usize) -> f64 {
    let tail = &bars[bars.len().saturating_sub(window)..];
    let returns: Vec<f64> = tail
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| (w[1].close - w[0].close) / w[0].close)
        .collect();
    population_stddev(&returns)
}

/// Directional persistence of the last `window` bars in [0, 1].
pub fn efficiency_ratio(bars: &[OhlcvBar], window: usize) -> f64 {
    let tail = &bars[bars.len().saturating_sub(window)..];
    if tail.len() < 2 {
        return 0.0;
    }
    let net = (tail[tail.len() - 1].close - tail[0].close).abs();
    let path: f64 = tail.windows(2).map(|w| (w[1].close - w[0].close).abs()).sum();
    if path > 0.0 { net / path } else { 0.0 }
}

pub(crate) fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
