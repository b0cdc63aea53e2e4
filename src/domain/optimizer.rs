//! Random-search optimizer over [`CandidateParams`].
//!
//! Candidates are drawn up front from the caller's RNG, so the set of trials
//! depends only on the seed. Trials are independent backtests over the same
//! read-only bars and may run on the rayon pool; the winner is picked with a
//! max-by-Sharpe reduction whose ties go to the lowest trial index, which
//! makes the result independent of execution order.

use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tracing::{debug, info};

use super::backtest::{
    run_backtest, BacktestConfig, CandidateParams, BASE_LENGTH_RANGE, EVAL_PERIOD_RANGE,
    RSI_OVERBOUGHT_RANGE, RSI_OVERSOLD_RANGE,
};
use super::metrics::PerformanceMetrics;
use super::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerConfig {
    pub trials: usize,
    pub parallel: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            trials: 100,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    pub best: CandidateParams,
    pub metrics: PerformanceMetrics,
    pub trial_index: usize,
    pub completed: usize,
    pub requested: usize,
}

#[derive(Debug, Clone)]
struct Trial {
    index: usize,
    params: CandidateParams,
    metrics: PerformanceMetrics,
}

impl Trial {
    fn score(&self) -> f64 {
        let s = self.metrics.sharpe_ratio;
        if s.is_finite() { s } else { f64::NEG_INFINITY }
    }
}

/// Higher Sharpe wins; equal Sharpe goes to the earlier trial.
fn better(a: Trial, b: Trial) -> Trial {
    match a.score().total_cmp(&b.score()) {
        Ordering::Greater => a,
        Ordering::Less => b,
        Ordering::Equal => {
            if a.index <= b.index {
                a
            } else {
                b
            }
        }
    }
}

/// Draw one candidate uniformly from the search space.
pub fn sample_candidate<R: Rng + ?Sized>(rng: &mut R) -> CandidateParams {
    CandidateParams {
        base_length: rng.gen_range(BASE_LENGTH_RANGE),
        eval_period: rng.gen_range(EVAL_PERIOD_RANGE),
        rsi_oversold: rng.gen_range(RSI_OVERSOLD_RANGE),
        rsi_overbought: rng.gen_range(RSI_OVERBOUGHT_RANGE),
    }
}

/// Run `config.trials` random candidates and return the best by Sharpe.
///
/// Setting `cancel` skips every trial that has not started yet; the result
/// is then the best of the completed trials, or `None` if none completed.
pub fn optimize<R: Rng + ?Sized>(
    bars: &[OhlcvBar],
    backtest: &BacktestConfig,
    config: &OptimizerConfig,
    rng: &mut R,
    cancel: &AtomicBool,
) -> Option<OptimizationOutcome> {
    let candidates: Vec<(usize, CandidateParams)> = (0..config.trials)
        .map(|i| (i, sample_candidate(rng)))
        .collect();

    info!(
        trials = config.trials,
        bars = bars.len(),
        parallel = config.parallel,
        "starting optimization"
    );

    let run_trial = |&(index, params): &(usize, CandidateParams)| -> Option<Trial> {
        if cancel.load(AtomicOrdering::Relaxed) {
            return None;
        }
        let result = run_backtest(bars, &params, backtest);
        debug!(
            trial = index,
            sharpe = result.metrics.sharpe_ratio,
            trades = result.metrics.total_trades,
            "trial complete"
        );
        Some(Trial {
            index,
            params,
            metrics: result.metrics,
        })
    };

    let completed: Vec<Trial> = if config.parallel {
        candidates.par_iter().filter_map(run_trial).collect()
    } else {
        candidates.iter().filter_map(run_trial).collect()
    };

    let completed_count = completed.len();
    let best = completed.into_iter().reduce(better)?;

    info!(
        trial = best.index,
        sharpe = best.metrics.sharpe_ratio,
        completed = completed_count,
        requested = config.trials,
        "optimization finished"
    );

    Some(OptimizationOutcome {
        best: best.params,
        metrics: best.metrics,
        trial_index: best.index,
        completed: completed_count,
        requested: config.trials,
    })
}
