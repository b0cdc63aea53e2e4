//! Configuration validation.
//!
//! Validates every section before a pipeline runs. Errors name the offending
//! `[section] key`. Missing numeric keys fall back to their defaults; present
//! but unparseable ones are rejected rather than silently defaulted.

use crate::domain::adaptive::{
    MA_FAST_MAX, MA_SLOW_MAX, RSI_PERIOD_MAX, RSI_PERIOD_MIN, THRESHOLD_MAX, THRESHOLD_MIN,
};
use crate::domain::error::AdaptraderError;
use crate::ports::config_port::ConfigPort;

/// Upper bound on optimizer trials accepted from configuration.
pub const MAX_TRIALS: i64 = 100_000;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), AdaptraderError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_optimizer_config(config)?;
    validate_adaptive_config(config)?;
    validate_history_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), AdaptraderError> {
    require_non_empty(config, "data", "path")?;
    require_non_empty(config, "data", "symbol")?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), AdaptraderError> {
    if let Some(capital) = parse_number(config, "backtest", "initial_capital")? {
        if capital <= 0.0 {
            return Err(invalid("backtest", "initial_capital", "initial_capital must be positive"));
        }
    }
    if let Some(rate) = parse_number(config, "backtest", "risk_free_rate")? {
        if !(0.0..1.0).contains(&rate) {
            return Err(invalid(
                "backtest",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }
    }
    Ok(())
}

/// Trial counts from the config file and from command-line overrides share this bound.
pub fn validate_trial_count(trials: i64) -> Result<(), AdaptraderError> {
    if (1..=MAX_TRIALS).contains(&trials) {
        Ok(())
    } else {
        Err(invalid(
            "optimizer",
            "trials",
            &format!("trials must be between 1 and {MAX_TRIALS}"),
        ))
    }
}

pub fn validate_optimizer_config(config: &dyn ConfigPort) -> Result<(), AdaptraderError> {
    if let Some(trials) = parse_integer(config, "optimizer", "trials")? {
        validate_trial_count(trials)?;
    }
    if let Some(seed) = parse_integer(config, "optimizer", "seed")? {
        if seed < 0 {
            return Err(invalid("optimizer", "seed", "seed must be non-negative"));
        }
    }
    if let Some(value) = config.get_string("optimizer", "parallel") {
        if parse_flag(&value).is_none() {
            return Err(invalid("optimizer", "parallel", "parallel must be true or false"));
        }
    }
    Ok(())
}

pub fn validate_adaptive_config(config: &dyn ConfigPort) -> Result<(), AdaptraderError> {
    let rsi = parse_integer(config, "adaptive", "rsi_period")?;
    if let Some(rsi) = rsi {
        let (lo, hi) = (RSI_PERIOD_MIN as i64, RSI_PERIOD_MAX as i64);
        if !(lo..=hi).contains(&rsi) {
            return Err(invalid(
                "adaptive",
                "rsi_period",
                &format!("rsi_period must be between {lo} and {hi}"),
            ));
        }
    }

    let fast = parse_integer(config, "adaptive", "ma_fast_period")?;
    if let Some(fast) = fast {
        if !(1..=MA_FAST_MAX as i64).contains(&fast) {
            return Err(invalid(
                "adaptive",
                "ma_fast_period",
                &format!("ma_fast_period must be between 1 and {MA_FAST_MAX}"),
            ));
        }
    }

    let slow = parse_integer(config, "adaptive", "ma_slow_period")?;
    if let Some(slow) = slow {
        if !(1..=MA_SLOW_MAX as i64).contains(&slow) {
            return Err(invalid(
                "adaptive",
                "ma_slow_period",
                &format!("ma_slow_period must be between 1 and {MA_SLOW_MAX}"),
            ));
        }
    }

    let fast = fast.unwrap_or(10);
    let slow = slow.unwrap_or(20);
    if fast >= slow {
        return Err(invalid(
            "adaptive",
            "ma_fast_period",
            "ma_fast_period must be shorter than ma_slow_period",
        ));
    }

    if let Some(threshold) = parse_number(config, "adaptive", "confidence_threshold")? {
        if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&threshold) {
            return Err(invalid(
                "adaptive",
                "confidence_threshold",
                &format!(
                    "confidence_threshold must be between {THRESHOLD_MIN} and {THRESHOLD_MAX}"
                ),
            ));
        }
    }
    Ok(())
}

pub fn validate_history_config(config: &dyn ConfigPort) -> Result<(), AdaptraderError> {
    if let Some(path) = config.get_string("history", "path") {
        if path.trim().is_empty() {
            return Err(invalid("history", "path", "path must not be empty when set"));
        }
    }
    Ok(())
}

/// `true/yes/1` or `false/no/0`, case-insensitive.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn require_non_empty(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), AdaptraderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(AdaptraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn parse_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, AdaptraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid(section, key, &format!("{key} must be a number, got '{raw}'"))),
        },
    }
}

fn parse_integer(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<i64>, AdaptraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("{key} must be an integer, got '{raw}'"))),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> AdaptraderError {
    AdaptraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = r#"
[data]
path = data/btc.csv
symbol = BTC/USD

[backtest]
initial_capital = 10000
risk_free_rate = 0.02

[optimizer]
trials = 50
seed = 42
parallel = true

[adaptive]
rsi_period = 14
ma_fast_period = 10
ma_slow_period = 20
confidence_threshold = 0.6

[history]
path = trades.csv
"#;

    fn invalid_key(err: AdaptraderError) -> String {
        match err {
            AdaptraderError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&make_config(VALID)).is_ok());
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = make_config("[data]\npath = a.csv\nsymbol = ETH/USD\n");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn missing_data_path_fails() {
        let err = validate_config(&make_config("[data]\nsymbol = BTC/USD\n")).unwrap_err();
        assert!(matches!(err, AdaptraderError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn blank_symbol_fails() {
        let config = make_config("[data]\npath = a.csv\nsymbol =   \n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, AdaptraderError::ConfigMissing { key, .. } if key == "symbol"));
    }

    #[test]
    fn initial_capital_must_be_positive() {
        let config = make_config("[backtest]\ninitial_capital = 0\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "initial_capital");
    }

    #[test]
    fn non_numeric_capital_is_rejected_not_defaulted() {
        let config = make_config("[backtest]\ninitial_capital = lots\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "initial_capital");
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        let config = make_config("[backtest]\nrisk_free_rate = 1.5\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "risk_free_rate");
    }

    #[test]
    fn trials_zero_fails() {
        let err = validate_optimizer_config(&make_config("[optimizer]\ntrials = 0\n")).unwrap_err();
        assert_eq!(invalid_key(err), "trials");
    }

    #[test]
    fn trial_count_bounds_are_inclusive() {
        assert!(validate_trial_count(1).is_ok());
        assert!(validate_trial_count(MAX_TRIALS).is_ok());
        assert_eq!(invalid_key(validate_trial_count(0).unwrap_err()), "trials");
        assert_eq!(invalid_key(validate_trial_count(MAX_TRIALS + 1).unwrap_err()), "trials");
    }

    #[test]
    fn negative_seed_fails() {
        let err = validate_optimizer_config(&make_config("[optimizer]\nseed = -1\n")).unwrap_err();
        assert_eq!(invalid_key(err), "seed");
    }

    #[test]
    fn bad_parallel_flag_fails() {
        let config = make_config("[optimizer]\nparallel = maybe\n");
        let err = validate_optimizer_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "parallel");
    }

    #[test]
    fn rsi_period_out_of_bounds_fails() {
        let config = make_config("[adaptive]\nrsi_period = 30\n");
        let err = validate_adaptive_config(&config).unwrap_err();
        assert_eq!(invalid_key(err), "rsi_period");
    }

    #[test]
    fn fast_must_be_shorter_than_slow() {
        let err = validate_adaptive_config(&make_config(
            "[adaptive]\nma_fast_period = 15\nma_slow_period = 12\n",
        ))
        .unwrap_err();
        assert_eq!(invalid_key(err), "ma_fast_period");
    }

    #[test]
    fn threshold_out_of_bounds_fails() {
        let err = validate_adaptive_config(&make_config("[adaptive]\nconfidence_threshold = 0.9\n"))
            .unwrap_err();
        assert_eq!(invalid_key(err), "confidence_threshold");
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("perhaps"), None);
    }
}
