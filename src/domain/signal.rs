//! Weighted multi-factor signal scoring.
//!
//! Five independent read-outs each add a bounded contribution to a buy or
//! sell score. Regime and risk then scale the scores, and a decision is only
//! emitted when the net score clears the adaptive confidence threshold.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::adaptive::AdaptiveParameters;
use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::regime::MarketRegime;
use crate::domain::risk::{RiskAssessment, RiskLevel};

/// Bars required before any scoring is attempted.
pub const MIN_BARS: usize = 100;

pub const EXTERNAL_WEIGHT: f64 = 0.40;
pub const MA_CROSS_WEIGHT: f64 = 0.20;
pub const RSI_WEIGHT: f64 = 0.15;
pub const MACD_CROSS_WEIGHT: f64 = 0.15;
pub const VOLUME_WEIGHT: f64 = 0.10;

/// External readings at or below this magnitude are ignored.
const EXTERNAL_DEADBAND: f64 = 0.3;
const VOLUME_CONFIRM_RATIO: f64 = 1.2;
const MIN_EMIT_CONFIDENCE: f64 = 0.5;

const TRENDING_BOOST: f64 = 1.2;
const SIDEWAYS_DAMPING: f64 = 0.8;
const HIGH_RISK_DAMPING: f64 = 0.7;
const LOW_RISK_BOOST: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => f.write_str("BUY"),
            Signal::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalResult {
    /// `None` is an implicit hold.
    pub signal: Option<Signal>,
    pub confidence: f64,
    pub buy_score: f64,
    pub sell_score: f64,
    pub net_score: f64,
    /// Factors and modulations that fired, in evaluation order.
    pub reasons: Vec<String>,
    pub market_regime: Option<MarketRegime>,
    pub risk_level: Option<RiskLevel>,
}

impl SignalResult {
    pub fn insufficient_data() -> Self {
        SignalResult {
            signal: None,
            confidence: 0.0,
            buy_score: 0.0,
            sell_score: 0.0,
            net_score: 0.0,
            reasons: vec!["insufficient data".to_string()],
            market_regime: None,
            risk_level: None,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.signal.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Crossing {
    Up,
    Down,
}

/// Strict sign change of a spread between the previous and current bar.
fn crossing(spread: Option<(f64, f64)>) -> Option<Crossing> {
    let (prev, cur) = spread?;
    if prev <= 0.0 && cur > 0.0 {
        Some(Crossing::Up)
    } else if prev >= 0.0 && cur < 0.0 {
        Some(Crossing::Down)
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct Scores {
    buy: f64,
    sell: f64,
    reasons: Vec<String>,
}

impl Scores {
    fn leader(&self) -> Option<Signal> {
        if self.buy > self.sell {
            Some(Signal::Buy)
        } else if self.sell > self.buy {
            Some(Signal::Sell)
        } else {
            None
        }
    }

    fn add(&mut self, side: Signal, amount: f64, reason: String) {
        match side {
            Signal::Buy => self.buy += amount,
            Signal::Sell => self.sell += amount,
        }
        self.reasons.push(reason);
    }

    fn scale(&mut self, factor: f64, reason: String) {
        self.buy *= factor;
        self.sell *= factor;
        self.reasons.push(reason);
    }
}

fn side_name(side: Signal) -> &'static str {
    match side {
        Signal::Buy => "buy",
        Signal::Sell => "sell",
    }
}

/// Score one evaluation window.
///
/// `external` is the optional directional reading in [-1, 1]; non-finite
/// values are treated as absent.
pub fn evaluate(
    window: &[OhlcvBar],
    snapshot: &IndicatorSnapshot,
    regime: MarketRegime,
    risk: &RiskAssessment,
    external: Option<f64>,
    params: &AdaptiveParameters,
) -> SignalResult {
    if window.len() < MIN_BARS {
        return SignalResult::insufficient_data();
    }

    let mut scores = Scores::default();

    if let Some(x) = external.filter(|x| x.is_finite()).map(|x| x.clamp(-1.0, 1.0)) {
        if x.abs() > EXTERNAL_DEADBAND {
            let side = if x > 0.0 { Signal::Buy } else { Signal::Sell };
            let label = if x > 0.0 { "bullish" } else { "bearish" };
            scores.add(
                side,
                EXTERNAL_WEIGHT * x.abs(),
                format!("ML signal {label} ({x:.2})"),
            );
        }
    }

    match crossing(snapshot.ma_spread()) {
        Some(Crossing::Up) => {
            scores.add(Signal::Buy, MA_CROSS_WEIGHT, "MA bullish crossover".into())
        }
        Some(Crossing::Down) => {
            scores.add(Signal::Sell, MA_CROSS_WEIGHT, "MA bearish crossover".into())
        }
        None => {}
    }

    if let Some(rsi) = snapshot.rsi {
        if rsi > 20.0 && rsi < 30.0 {
            scores.add(Signal::Buy, RSI_WEIGHT, format!("RSI oversold recovery ({rsi:.1})"));
        } else if rsi > 70.0 && rsi < 80.0 {
            scores.add(
                Signal::Sell,
                RSI_WEIGHT,
                format!("RSI overbought exhaustion ({rsi:.1})"),
            );
        }
    }

    match crossing(snapshot.macd_spread()) {
        Some(Crossing::Up) => {
            scores.add(Signal::Buy, MACD_CROSS_WEIGHT, "MACD bullish crossover".into())
        }
        Some(Crossing::Down) => {
            scores.add(Signal::Sell, MACD_CROSS_WEIGHT, "MACD bearish crossover".into())
        }
        None => {}
    }

    let volume_ratio = snapshot.volume_ratio();
    if volume_ratio > VOLUME_CONFIRM_RATIO {
        if let Some(side) = scores.leader() {
            scores.add(
                side,
                VOLUME_WEIGHT,
                format!("Volume confirmation ({volume_ratio:.2}x avg) for {}", side_name(side)),
            );
        }
    }

    match regime {
        MarketRegime::Trending => {
            if let Some(side) = scores.leader() {
                match side {
                    Signal::Buy => scores.buy *= TRENDING_BOOST,
                    Signal::Sell => scores.sell *= TRENDING_BOOST,
                }
                scores
                    .reasons
                    .push(format!("Trending regime boosts {} side", side_name(side)));
            }
        }
        MarketRegime::Sideways => {
            scores.scale(SIDEWAYS_DAMPING, "Sideways regime dampens both sides".into())
        }
        MarketRegime::Volatile => {}
    }

    match risk.level {
        RiskLevel::High => scores.scale(HIGH_RISK_DAMPING, "High risk dampens both sides".into()),
        RiskLevel::Low => scores.scale(LOW_RISK_BOOST, "Low risk boosts both sides".into()),
        RiskLevel::Medium => {}
    }

    let net = scores.buy - scores.sell;
    let confidence = net.abs().max(risk.confidence).min(1.0);
    let signal = if net.abs() > params.confidence_threshold && confidence > MIN_EMIT_CONFIDENCE {
        Some(if net > 0.0 { Signal::Buy } else { Signal::Sell })
    } else {
        None
    };

    SignalResult {
        signal,
        confidence,
        buy_score: scores.buy,
        sell_score: scores.sell,
        net_score: net,
        reasons: scores.reasons,
        market_regime: Some(regime),
        risk_level: Some(risk.level),
    }
}
