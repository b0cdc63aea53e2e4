//! Market regime classification from return dispersion and directional persistence.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::indicator::{efficiency_ratio, return_volatility};
use crate::domain::ohlcv::OhlcvBar;

pub const REGIME_WINDOW: usize = 20;
/// Return standard deviation above which the window is volatile.
pub const VOLATILE_THRESHOLD: f64 = 0.025;
/// Efficiency ratio at or above which the window is trending.
pub const TREND_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketRegime {
    Trending,
    Volatile,
    Sideways,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarketRegime::Trending => "trending",
            MarketRegime::Volatile => "volatile",
            MarketRegime::Sideways => "sideways",
        };
        f.write_str(name)
    }
}

/// Label the trailing `window` bars. Dispersion wins over persistence: a
/// window that is both directional and wild is volatile.
pub fn classify_regime(bars: &[OhlcvBar], window: usize) -> MarketRegime {
    if bars.len() < 3 {
        return MarketRegime::Sideways;
    }
    if return_volatility(bars, window) > VOLATILE_THRESHOLD {
        MarketRegime::Volatile
    } else if efficiency_ratio(bars, window) >= TREND_THRESHOLD {
        MarketRegime::Trending
    } else {
        MarketRegime::Sideways
    }
}
