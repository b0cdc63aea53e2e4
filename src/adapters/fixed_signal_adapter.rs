//! External signal adapter that serves values fixed at construction,
//! typically from command-line flags.

use crate::domain::error::AdaptraderError;
use crate::domain::external::{ExternalInputs, Sentiment, SentimentLabel};
use crate::ports::signal_port::SignalPort;

#[derive(Debug, Clone, Default)]
pub struct FixedSignalAdapter {
    inputs: ExternalInputs,
}

impl FixedSignalAdapter {
    pub fn new(inputs: ExternalInputs) -> Self {
        Self { inputs }
    }

    /// Build from raw flag values. A sentiment label without a score uses 1.0.
    pub fn from_flags(
        directional: Option<f64>,
        sentiment: Option<&str>,
        sentiment_score: Option<f64>,
        news: Option<String>,
    ) -> Result<Self, AdaptraderError> {
        let sentiment = match sentiment {
            Some(label) => {
                let label: SentimentLabel = label
                    .parse()
                    .map_err(|reason| AdaptraderError::ExternalSignal { reason })?;
                Some(Sentiment {
                    label,
                    score: sentiment_score.unwrap_or(1.0),
                })
            }
            None => None,
        };
        Ok(Self::new(ExternalInputs {
            directional,
            sentiment,
            news,
        }))
    }
}

impl SignalPort for FixedSignalAdapter {
    fn fetch(&self, _symbol: &str) -> Result<ExternalInputs, AdaptraderError> {
        Ok(self.inputs.clone())
    }
}
