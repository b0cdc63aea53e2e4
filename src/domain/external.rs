//! Optional read-outs supplied by external collaborators (ML signal, sentiment, news).
//!
//! Every field is optional; absent or unusable values are treated as neutral.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "bullish" => Ok(SentimentLabel::Positive),
            "neutral" => Ok(SentimentLabel::Neutral),
            "negative" | "bearish" => Ok(SentimentLabel::Negative),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// Classifier confidence in [0, 1].
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalInputs {
    /// Directional signal in [-1, 1]; positive is bullish.
    pub directional: Option<f64>,
    pub sentiment: Option<Sentiment>,
    pub news: Option<String>,
}

impl ExternalInputs {
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Drop non-finite values and clamp the rest into their documented ranges.
    pub fn sanitized(self) -> Self {
        let directional = self
            .directional
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(-1.0, 1.0));
        let sentiment = self
            .sentiment
            .filter(|s| s.score.is_finite())
            .map(|s| Sentiment {
                label: s.label,
                score: s.score.clamp(0.0, 1.0),
            });
        let news = self.news.filter(|n| !n.trim().is_empty());
        Self {
            directional,
            sentiment,
            news,
        }
    }
}
