//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_trade_log::CsvTradeLog;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fixed_signal_adapter::FixedSignalAdapter;
use crate::domain::adaptive::AdaptiveParameters;
use crate::domain::backtest::{
    run_backtest, BacktestConfig, BacktestResult, CandidateParams, MIN_BACKTEST_BARS,
};
use crate::domain::config_validation::{
    validate_adaptive_config, validate_backtest_config, validate_config, validate_data_config,
    validate_optimizer_config, validate_trial_count,
};
use crate::domain::engine::TradingEngine;
use crate::domain::error::AdaptraderError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::optimizer::{optimize, OptimizerConfig};
use crate::domain::regime::{classify_regime, REGIME_WINDOW};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::history_port::TradeHistoryPort;

pub const DEFAULT_SEED: u64 = 42;

#[derive(Parser, Debug)]
#[command(name = "adaptrader", about = "Adaptive signal scoring and strategy optimization")]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score the latest bar and plan a trade
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        /// External directional signal in [-1, 1]
        #[arg(long, allow_hyphen_values = true)]
        directional: Option<f64>,
        /// Sentiment label (positive, negative, neutral)
        #[arg(long)]
        sentiment: Option<String>,
        #[arg(long)]
        sentiment_score: Option<f64>,
        /// Free-text news scanned for risk keywords
        #[arg(long)]
        news: Option<String>,
        /// Account balance used for sizing
        #[arg(long, default_value_t = 10_000.0)]
        balance: f64,
    },
    /// Backtest one candidate parameter set
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        base_length: Option<usize>,
        #[arg(long)]
        eval_period: Option<usize>,
        #[arg(long)]
        rsi_oversold: Option<f64>,
        #[arg(long)]
        rsi_overbought: Option<f64>,
        /// Write closed trades as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the per-bar equity curve as CSV
        #[arg(long)]
        equity: Option<PathBuf>,
        /// Append closed trades to the configured history log
        #[arg(long)]
        record: bool,
    },
    /// Random-search the candidate space for the best Sharpe ratio
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        trials: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Run trials one at a time
        #[arg(long)]
        sequential: bool,
        /// Stop starting new trials after this many seconds
        #[arg(long)]
        time_limit: Option<u64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Signal {
            config,
            directional,
            sentiment,
            sentiment_score,
            news,
            balance,
        } => {
            let signal = match FixedSignalAdapter::from_flags(
                directional,
                sentiment.as_deref(),
                sentiment_score,
                news,
            ) {
                Ok(s) => s,
                Err(e) => return report(&e),
            };
            run_signal(&config, &signal, balance)
        }
        Command::Backtest {
            config,
            base_length,
            eval_period,
            rsi_oversold,
            rsi_overbought,
            output,
            equity,
            record,
        } => {
            let overrides = CandidateOverrides {
                base_length,
                eval_period,
                rsi_oversold,
                rsi_overbought,
            };
            run_backtest_pipeline(&config, &overrides, output.as_deref(), equity.as_deref(), record)
        }
        Command::Optimize {
            config,
            trials,
            seed,
            sequential,
            time_limit,
        } => run_optimize(&config, trials, seed, sequential, time_limit),
        Command::Validate { config } => run_validate(&config),
    }
}

fn report(err: &AdaptraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| report(&e))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, AdaptraderError> {
    validate_backtest_config(config)?;
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        symbol: config.get_string("data", "symbol").unwrap_or(defaults.symbol),
        initial_capital: config.get_double("backtest", "initial_capital", defaults.initial_capital),
        risk_free_rate: config.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
    })
}

/// Optimizer settings plus the RNG seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerSettings {
    pub config: OptimizerConfig,
    pub seed: u64,
}

pub fn build_optimizer_config(
    config: &dyn ConfigPort,
) -> Result<OptimizerSettings, AdaptraderError> {
    validate_optimizer_config(config)?;
    let defaults = OptimizerConfig::default();
    Ok(OptimizerSettings {
        config: OptimizerConfig {
            trials: config.get_int("optimizer", "trials", defaults.trials as i64) as usize,
            parallel: config.get_bool("optimizer", "parallel", defaults.parallel),
        },
        seed: config.get_int("optimizer", "seed", DEFAULT_SEED as i64) as u64,
    })
}

pub fn build_adaptive_params(
    config: &dyn ConfigPort,
) -> Result<AdaptiveParameters, AdaptraderError> {
    validate_adaptive_config(config)?;
    let defaults = AdaptiveParameters::default();
    let period =
        |key: &str, default: usize| config.get_int("adaptive", key, default as i64) as usize;
    Ok(AdaptiveParameters {
        rsi_period: period("rsi_period", defaults.rsi_period),
        ma_fast_period: period("ma_fast_period", defaults.ma_fast_period),
        ma_slow_period: period("ma_slow_period", defaults.ma_slow_period),
        confidence_threshold: config.get_double(
            "adaptive",
            "confidence_threshold",
            defaults.confidence_threshold,
        ),
    })
}

/// Command-line replacements for individual candidate fields.
#[derive(Debug, Clone, Default)]
pub struct CandidateOverrides {
    pub base_length: Option<usize>,
    pub eval_period: Option<usize>,
    pub rsi_oversold: Option<f64>,
    pub rsi_overbought: Option<f64>,
}

impl CandidateOverrides {
    pub fn apply(&self, base: CandidateParams) -> Result<CandidateParams, AdaptraderError> {
        let candidate = CandidateParams {
            base_length: self.base_length.unwrap_or(base.base_length),
            eval_period: self.eval_period.unwrap_or(base.eval_period),
            rsi_oversold: self.rsi_oversold.unwrap_or(base.rsi_oversold),
            rsi_overbought: self.rsi_overbought.unwrap_or(base.rsi_overbought),
        };
        if candidate.base_length < 2 || candidate.eval_period == 0 {
            return Err(AdaptraderError::ConfigInvalid {
                section: "backtest".into(),
                key: "base_length".into(),
                reason: "base_length must be at least 2 and eval_period at least 1".into(),
            });
        }
        if !(0.0..=100.0).contains(&candidate.rsi_oversold)
            || !(0.0..=100.0).contains(&candidate.rsi_overbought)
            || candidate.rsi_oversold >= candidate.rsi_overbought
        {
            return Err(AdaptraderError::ConfigInvalid {
                section: "backtest".into(),
                key: "rsi_oversold".into(),
                reason: "RSI bounds must lie in [0, 100] with oversold below overbought".into(),
            });
        }
        Ok(candidate)
    }
}

/// Loads bars for the configured symbol.
fn load_bars(config: &dyn ConfigPort) -> Result<(String, Vec<OhlcvBar>), AdaptraderError> {
    validate_data_config(config)?;
    let path = config.get_string("data", "path").unwrap_or_default();
    let symbol = config.get_string("data", "symbol").unwrap_or_default();
    let bars = CsvAdapter::new(PathBuf::from(path.trim())).fetch_bars(symbol.trim())?;
    eprintln!("Loaded {} bars for {}", bars.len(), symbol.trim());
    Ok((symbol.trim().to_string(), bars))
}

fn history_log(config: &dyn ConfigPort) -> Option<CsvTradeLog> {
    config
        .get_string("history", "path")
        .map(|p| CsvTradeLog::new(PathBuf::from(p.trim())))
}

pub fn run_signal(config_path: &Path, signal: &FixedSignalAdapter, balance: f64) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&adapter) {
        return report(&e);
    }
    match signal_pipeline(&adapter, signal, balance) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn signal_pipeline(
    config: &dyn ConfigPort,
    signal: &FixedSignalAdapter,
    balance: f64,
) -> Result<(), AdaptraderError> {
    if !balance.is_finite() || balance <= 0.0 {
        return Err(AdaptraderError::InvalidInput {
            index: 0,
            reason: format!("balance must be positive, got {balance}"),
        });
    }
    let params = build_adaptive_params(config)?;
    let (symbol, bars) = load_bars(config)?;
    let history = match history_log(config) {
        Some(log) => log.load_trades()?,
        None => Vec::new(),
    };

    let mut engine = TradingEngine::new(symbol, params);
    if !history.is_empty() {
        let adapted = engine.adapt(&history);
        info!(trades = history.len(), ?adapted, "parameters adapted from history");
    }

    let inputs = engine.gather_inputs(signal);
    let result = engine.evaluate(&bars, &inputs)?;

    let decision = result
        .signal
        .map_or_else(|| "HOLD".to_string(), |s| s.to_string());
    println!("Symbol:      {}", engine.symbol());
    println!("Signal:      {decision}");
    println!("Confidence:  {:.2}", result.confidence);
    println!(
        "Scores:      buy {:.3}  sell {:.3}  net {:.3}",
        result.buy_score, result.sell_score, result.net_score
    );
    if let Some(regime) = result.market_regime {
        println!("Regime:      {regime}");
    }
    if let Some(level) = result.risk_level {
        println!("Risk:        {level}");
    }
    for reason in &result.reasons {
        println!("  - {reason}");
    }
    if !history.is_empty() {
        let past = PerformanceMetrics::from_trades(&history, balance, 0.0);
        println!(
            "History:     {} trades, win rate {:.2}%, PnL {:.2}, max drawdown {:.2}%",
            past.total_trades,
            past.win_rate * 100.0,
            past.total_pnl,
            past.max_drawdown_percent
        );
    }

    if !result.is_hold() {
        let regime = result
            .market_regime
            .unwrap_or_else(|| classify_regime(&bars, REGIME_WINDOW));
        let plan = engine.plan_trade(&bars, balance, &history, regime);
        println!("Quantity:    {:.6}", plan.sizing.quantity);
        println!("Risk amount: {:.2}", plan.sizing.risk_amount);
        println!("Take profit: {:.2}%", plan.exits.take_profit_percent);
        println!("Stop loss:   {:.2}%", plan.exits.stop_loss_percent);
        println!("Sizing:      {}", plan.sizing.reasoning);
        println!("Exits:       {}", plan.exits.reasoning);
    }
    Ok(())
}

pub fn run_backtest_pipeline(
    config_path: &Path,
    overrides: &CandidateOverrides,
    output: Option<&Path>,
    equity: Option<&Path>,
    record: bool,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let outcome = (|| -> Result<BacktestResult, AdaptraderError> {
        let bt_config = build_backtest_config(&adapter)?;
        let candidate = overrides.apply(CandidateParams::default())?;
        let (_, bars) = load_bars(&adapter)?;
        let result = run_backtest(&bars, &candidate, &bt_config);
        if let Some(path) = output {
            write_csv(path, &result.trades)?;
            eprintln!("Trades written to {}", path.display());
        }
        if let Some(path) = equity {
            write_csv(path, &result.equity_curve)?;
            eprintln!("Equity curve written to {}", path.display());
        }
        if record {
            let log = history_log(&adapter).ok_or_else(|| AdaptraderError::ConfigMissing {
                section: "history".into(),
                key: "path".into(),
            })?;
            for trade in &result.trades {
                log.append_trade(trade)?;
            }
            eprintln!("Recorded {} trades", result.trades.len());
        }
        Ok(result)
    })();

    match outcome {
        Ok(result) => {
            print_metrics(&result.metrics);
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

pub fn run_optimize(
    config_path: &Path,
    trials: Option<usize>,
    seed: Option<u64>,
    sequential: bool,
    time_limit: Option<u64>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    type Prepared = (BacktestConfig, OptimizerSettings, Vec<OhlcvBar>);
    let prepared = (|| -> Result<Prepared, AdaptraderError> {
        let bt_config = build_backtest_config(&adapter)?;
        let mut settings = build_optimizer_config(&adapter)?;
        if let Some(t) = trials {
            validate_trial_count(i64::try_from(t).unwrap_or(i64::MAX))?;
            settings.config.trials = t;
        }
        if let Some(s) = seed {
            settings.seed = s;
        }
        if sequential {
            settings.config.parallel = false;
        }
        let (_, bars) = load_bars(&adapter)?;
        if bars.len() < MIN_BACKTEST_BARS {
            return Err(AdaptraderError::InsufficientData {
                bars: bars.len(),
                minimum: MIN_BACKTEST_BARS,
            });
        }
        Ok((bt_config, settings, bars))
    })();
    let (bt_config, settings, bars) = match prepared {
        Ok(p) => p,
        Err(e) => return report(&e),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    if let Some(secs) = time_limit {
        let flag = Arc::clone(&cancel);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            flag.store(true, Ordering::Relaxed);
        });
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    eprintln!(
        "Running {} trials (seed {}, {})",
        settings.config.trials,
        settings.seed,
        if settings.config.parallel { "parallel" } else { "sequential" }
    );
    match optimize(&bars, &bt_config, &settings.config, &mut rng, &cancel) {
        Some(outcome) => {
            println!(
                "Best trial:      {} ({} of {} completed)",
                outcome.trial_index, outcome.completed, outcome.requested
            );
            println!("base_length:     {}", outcome.best.base_length);
            println!("eval_period:     {}", outcome.best.eval_period);
            println!("rsi_oversold:    {:.2}", outcome.best.rsi_oversold);
            println!("rsi_overbought:  {:.2}", outcome.best.rsi_overbought);
            print_metrics(&outcome.metrics);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("error: no trials completed");
            ExitCode::from(1)
        }
    }
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&adapter) {
        return report(&e);
    }
    eprintln!("Configuration is valid");
    ExitCode::SUCCESS
}

fn write_csv<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), AdaptraderError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_metrics(m: &PerformanceMetrics) {
    println!("Trades:          {} ({} wins, {} losses)", m.total_trades, m.wins, m.losses);
    println!("Total PnL:       {:.2}", m.total_pnl);
    println!("Total return:    {:.2}%", m.total_return * 100.0);
    println!("Win rate:        {:.2}%", m.win_rate * 100.0);
    println!("Profit factor:   {:.2}", m.profit_factor);
    println!(
        "Max drawdown:    {:.2} ({:.2}%)",
        m.max_drawdown,
        m.max_drawdown_percent
    );
    println!("Sharpe ratio:    {:.3}", m.sharpe_ratio);
}
