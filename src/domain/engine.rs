//! Trading engine: one evaluation cycle from bars to decision and trade plan.
//!
//! Owns the adaptive parameters for one symbol. Bars are validated at this
//! boundary; everything below assumes clean input.

use tracing::{debug, warn};

use super::adaptive::{AdaptiveController, AdaptiveParameters, ADAPT_WINDOW};
use super::error::AdaptraderError;
use super::external::ExternalInputs;
use super::indicator::compute_snapshot;
use super::ohlcv::{validate_bars, OhlcvBar};
use super::regime::{classify_regime, MarketRegime, REGIME_WINDOW};
use super::risk::assess_risk;
use super::signal::{self, SignalResult, MIN_BARS};
use super::sizing::{compute_exit_levels, size_position, trade_stats, ExitLevels, PositionSizing};
use super::trade::TradeRecord;
use crate::ports::signal_port::SignalPort;

#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub sizing: PositionSizing,
    pub exits: ExitLevels,
}

#[derive(Debug, Clone)]
pub struct TradingEngine {
    symbol: String,
    controller: AdaptiveController,
}

impl TradingEngine {
    pub fn new(symbol: impl Into<String>, params: AdaptiveParameters) -> Self {
        TradingEngine {
            symbol: symbol.into(),
            controller: AdaptiveController::new(params),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn params(&self) -> &AdaptiveParameters {
        self.controller.params()
    }

    /// Score the latest bar.
    ///
    /// Malformed bars are an error. Too few bars is not: it yields the
    /// insufficient-data result.
    pub fn evaluate(
        &self,
        bars: &[OhlcvBar],
        inputs: &ExternalInputs,
    ) -> Result<SignalResult, AdaptraderError> {
        validate_bars(bars)?;
        if bars.len() < MIN_BARS {
            debug!(bars = bars.len(), minimum = MIN_BARS, "insufficient data for signal");
            return Ok(SignalResult::insufficient_data());
        }

        let params = self.controller.params();
        let inputs = inputs.clone().sanitized();
        let snapshot = compute_snapshot(bars, params);
        let regime = classify_regime(bars, REGIME_WINDOW);
        let risk = assess_risk(bars, &snapshot, &inputs);
        let result = signal::evaluate(bars, &snapshot, regime, &risk, inputs.directional, params);

        debug!(
            symbol = %self.symbol,
            signal = ?result.signal,
            net = result.net_score,
            confidence = result.confidence,
            regime = %regime,
            risk = %risk.level,
            "evaluated"
        );
        Ok(result)
    }

    /// Feed closed trades back into the parameters; returns the new values.
    pub fn adapt(&mut self, history: &[TradeRecord]) -> AdaptiveParameters {
        *self.controller.adapt(history)
    }

    /// Size and bracket a position entered at the last close.
    pub fn plan_trade(
        &self,
        bars: &[OhlcvBar],
        balance: f64,
        history: &[TradeRecord],
        regime: MarketRegime,
    ) -> TradePlan {
        let price = bars.last().map_or(f64::NAN, |b| b.close);
        let stats = trade_stats(history, ADAPT_WINDOW);
        let recent = &history[history.len().saturating_sub(ADAPT_WINDOW)..];

        TradePlan {
            sizing: size_position(
                balance,
                price,
                stats.win_rate,
                stats.avg_win,
                stats.avg_loss,
                recent,
            ),
            exits: compute_exit_levels(bars, price, regime, stats.win_rate),
        }
    }

    /// Ask the external collaborator for inputs; any failure degrades to neutral.
    pub fn gather_inputs(&self, port: &dyn SignalPort) -> ExternalInputs {
        match port.fetch(&self.symbol) {
            Ok(inputs) => inputs.sanitized(),
            Err(e) => {
                warn!(
                    symbol = %self.symbol,
                    error = %e,
                    "external signal unavailable, using neutral inputs"
                );
                ExternalInputs::neutral()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::bars_from_closes;
    use crate::domain::sizing::{FALLBACK_STOP_LOSS, FALLBACK_TAKE_PROFIT, MIN_POSITION_SIZE};
    use crate::domain::trade::trade_with_pnl;

    struct FailingSignal;

    impl SignalPort for FailingSignal {
        fn fetch(&self, _symbol: &str) -> Result<ExternalInputs, AdaptraderError> {
            Err(AdaptraderError::ExternalSignal {
                reason: "timeout".into(),
            })
        }
    }

    struct NoisySignal;

    impl SignalPort for NoisySignal {
        fn fetch(&self, _symbol: &str) -> Result<ExternalInputs, AdaptraderError> {
            Ok(ExternalInputs {
                directional: Some(4.0),
                ..ExternalInputs::neutral()
            })
        }
    }

    fn engine() -> TradingEngine {
        TradingEngine::new("BTC/USD", AdaptiveParameters::default())
    }

    #[test]
    fn nan_close_is_rejected() {
        let mut bars = bars_from_closes(&[100.0; 120]);
        bars[50].close = f64::NAN;
        let err = engine().evaluate(&bars, &ExternalInputs::neutral()).unwrap_err();
        assert!(matches!(err, AdaptraderError::InvalidInput { index: 50, .. }));
    }

    #[test]
    fn short_history_is_not_an_error() {
        let bars = bars_from_closes(&[100.0; 40]);
        let result = engine().evaluate(&bars, &ExternalInputs::neutral()).unwrap();
        assert!(result.is_hold());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn enough_bars_always_report_regime_and_risk() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + (i % 7) as f64).collect();
        let result = engine()
            .evaluate(&bars_from_closes(&closes), &ExternalInputs::neutral())
            .unwrap();
        assert!(result.market_regime.is_some());
        assert!(result.risk_level.is_some());
    }

    #[test]
    fn failing_collaborator_degrades_to_neutral() {
        assert_eq!(engine().gather_inputs(&FailingSignal), ExternalInputs::neutral());
    }

    #[test]
    fn collaborator_values_are_sanitized() {
        assert_eq!(engine().gather_inputs(&NoisySignal).directional, Some(1.0));
    }

    #[test]
    fn adapt_updates_owned_parameters() {
        let mut engine = engine();
        let losses: Vec<_> = (0..15).map(|_| trade_with_pnl(-1.0)).collect();
        let updated = engine.adapt(&losses);
        assert_eq!(updated.rsi_period, 15);
        assert_eq!(engine.params().rsi_period, 15);
    }

    #[test]
    fn plan_trade_without_bars_falls_back() {
        let plan = engine().plan_trade(&[], 10_000.0, &[], MarketRegime::Trending);
        assert_eq!(plan.sizing.quantity, MIN_POSITION_SIZE);
        assert_eq!(plan.exits.take_profit_percent, FALLBACK_TAKE_PROFIT);
        assert_eq!(plan.exits.stop_loss_percent, FALLBACK_STOP_LOSS);
    }

    #[test]
    fn plan_trade_respects_concentration_cap() {
        let bars = bars_from_closes(&(0..50).map(|i| 100.0 + i as f64 * 0.1).collect::<Vec<_>>());
        let history: Vec<_> = [5.0, 5.0, -1.0, 5.0, 5.0]
            .iter()
            .map(|&p| trade_with_pnl(p))
            .collect();
        let plan = engine().plan_trade(&bars, 10_000.0, &history, MarketRegime::Trending);
        let price = bars.last().unwrap().close;
        assert!(plan.sizing.quantity <= 0.10 * 10_000.0 / price + 1e-12);
        assert!(plan.sizing.quantity >= MIN_POSITION_SIZE);
    }
}
