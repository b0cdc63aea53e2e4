//! Risk assessment of current market conditions.
//!
//! Each factor contributes points to a score; the score maps to a level.
//! Confidence grows with the number of factors that fired.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::external::{ExternalInputs, SentimentLabel};
use crate::domain::indicator::{efficiency_ratio, return_volatility, IndicatorSnapshot};
use crate::domain::ohlcv::OhlcvBar;

pub const RISK_WINDOW: usize = 20;

const NEWS_RISK_KEYWORDS: &[&str] = &[
    "hack",
    "exploit",
    "lawsuit",
    "ban",
    "crash",
    "fraud",
    "investigation",
    "bankrupt",
    "liquidation",
    "delist",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: i32,
    pub confidence: f64,
    pub factors: Vec<String>,
}

impl RiskAssessment {
    pub fn neutral() -> Self {
        RiskAssessment {
            level: RiskLevel::Medium,
            score: 0,
            confidence: 0.0,
            factors: Vec::new(),
        }
    }
}

pub fn assess_risk(
    bars: &[OhlcvBar],
    snapshot: &IndicatorSnapshot,
    inputs: &ExternalInputs,
) -> RiskAssessment {
    let mut score = 0;
    let mut factors = Vec::new();

    let volatility = return_volatility(bars, RISK_WINDOW);
    if volatility > 0.03 {
        score += 2;
        factors.push(format!("High volatility ({:.2}%)", volatility * 100.0));
    } else if volatility > 0.015 {
        score += 1;
        factors.push(format!("Elevated volatility ({:.2}%)", volatility * 100.0));
    }

    if let Some(rsi) = snapshot.rsi {
        if !(20.0..=80.0).contains(&rsi) {
            score += 2;
            factors.push(format!("Extreme RSI ({:.1})", rsi));
        } else if !(30.0..=70.0).contains(&rsi) {
            score += 1;
            factors.push(format!("Stretched RSI ({:.1})", rsi));
        }
    }

    let volume_ratio = snapshot.volume_ratio();
    if volume_ratio > 2.0 {
        score += 1;
        factors.push(format!("Abnormal volume spike ({:.2}x)", volume_ratio));
    } else if snapshot.avg_volume > 0.0 && volume_ratio < 0.5 {
        score += 1;
        factors.push(format!("Thin volume ({:.2}x)", volume_ratio));
    }

    if bars.len() >= 3 {
        let clarity = efficiency_ratio(bars, RISK_WINDOW);
        if clarity < 0.2 {
            score += 1;
            factors.push(format!("Unclear trend (efficiency {:.2})", clarity));
        } else if clarity > 0.6 {
            score -= 1;
            factors.push(format!("Clear trend (efficiency {:.2})", clarity));
        }
    }

    if let Some(sentiment) = inputs.sentiment {
        if sentiment.score >= 0.6 {
            match sentiment.label {
                SentimentLabel::Negative => {
                    score += 1;
                    factors.push(format!("Negative sentiment ({:.2})", sentiment.score));
                }
                SentimentLabel::Positive => {
                    score -= 1;
                    factors.push(format!("Positive sentiment ({:.2})", sentiment.score));
                }
                SentimentLabel::Neutral => {}
            }
        }
    }

    if let Some(news) = inputs.news.as_deref() {
        let hits = scan_news(news);
        if !hits.is_empty() {
            score += hits.len().min(2) as i32;
            factors.push(format!("Risk keywords in news: {}", hits.join(", ")));
        }
    }

    let level = match score {
        s if s >= 4 => RiskLevel::High,
        s if s >= 2 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    };
    let confidence = (0.4 + 0.1 * factors.len() as f64).min(0.9);

    RiskAssessment {
        level,
        score,
        confidence,
        factors,
    }
}

/// Risk keywords present in `text`, in keyword-list order.
pub fn scan_news(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    NEWS_RISK_KEYWORDS
        .iter()
        .filter(|kw| words.iter().any(|w| is_inflection_of(w, kw)))
        .copied()
        .collect()
}

fn is_inflection_of(word: &str, keyword: &str) -> bool {
    const SUFFIXES: &[&str] = &["", "s", "ed", "ing", "es", "cy", "ned", "ning"];
    word.strip_prefix(keyword)
        .is_some_and(|rest| SUFFIXES.contains(&rest))
}
