//! Append-only CSV trade history.

use crate::domain::error::AdaptraderError;
use crate::domain::trade::TradeRecord;
use crate::ports::history_port::TradeHistoryPort;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing::warn;

pub struct CsvTradeLog {
    path: PathBuf,
}

impl CsvTradeLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TradeHistoryPort for CsvTradeLog {
    /// A missing file is an empty history. Rows that cannot be parsed or fail
    /// validation are skipped with a warning; the rest of the file still loads.
    fn load_trades(&self) -> Result<Vec<TradeRecord>, AdaptraderError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&self.path)?;
        let mut trades = Vec::new();
        for (row, result) in rdr.deserialize::<TradeRecord>().enumerate() {
            let trade = match result {
                Ok(trade) => trade,
                Err(e) => {
                    warn!(line = row + 2, error = %e, "skipping unreadable trade row");
                    continue;
                }
            };
            match trade.validate() {
                Ok(()) => trades.push(trade),
                Err(e) => warn!(line = row + 2, error = %e, "skipping invalid trade row"),
            }
        }
        Ok(trades)
    }

    fn append_trade(&self, trade: &TradeRecord) -> Result<(), AdaptraderError> {
        trade.validate()?;
        let needs_header = fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(trade)?;
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::{ExitReason, trade_with_pnl};
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let log = CsvTradeLog::new(dir.path().join("trades.csv"));
        assert!(log.load_trades().unwrap().is_empty());
    }

    #[test]
    fn appended_trades_load_back_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let log = CsvTradeLog::new(path.clone());
        log.append_trade(&trade_with_pnl(5.0)).unwrap();
        log.append_trade(&trade_with_pnl(-3.0)).unwrap();

        let trades = log.load_trades().unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0], trade_with_pnl(5.0));
        assert_eq!(trades[1].pnl, -3.0);

        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.matches("symbol").count(), 1, "header written once");
        assert!(text.contains("Stop Loss Hit"));
    }

    #[test]
    fn invalid_trade_is_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let log = CsvTradeLog::new(path.clone());
        let bad = TradeRecord {
            entry_price: f64::NAN,
            ..trade_with_pnl(1.0)
        };
        assert!(matches!(
            log.append_trade(&bad),
            Err(AdaptraderError::InvalidTrade { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn unreadable_row_does_not_hide_the_rest_of_the_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let log = CsvTradeLog::new(path.clone());
        log.append_trade(&trade_with_pnl(5.0)).unwrap();

        // Hand-edited row with a non-numeric pnl, then a valid row after it.
        let mut text = fs::read_to_string(&path).unwrap();
        let good_row = text.lines().nth(1).unwrap().to_string();
        let mut fields: Vec<&str> = good_row.split(',').collect();
        fields[6] = "abc";
        let bad_row = fields.join(",");
        text.push_str(&bad_row);
        text.push('\n');
        fs::write(&path, text).unwrap();
        log.append_trade(&trade_with_pnl(-2.0)).unwrap();

        let trades = log.load_trades().unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].pnl, 5.0);
        assert_eq!(trades[1].pnl, -2.0);
    }

    #[test]
    fn externally_recorded_exit_reasons_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let log = CsvTradeLog::new(path.clone());
        log.append_trade(&trade_with_pnl(-1.0)).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let row = text.lines().nth(1).unwrap().to_string();
        let manual = row.replace("Stop Loss Hit", "Manual");
        let reversal = row.replace("Stop Loss Hit", "Signal Reversal");
        fs::write(&path, format!("{text}{manual}\n{reversal}\n")).unwrap();

        let trades = log.load_trades().unwrap();
        let reasons: Vec<ExitReason> = trades.iter().map(|t| t.exit_reason).collect();
        assert_eq!(
            reasons,
            vec![
                ExitReason::StopLoss,
                ExitReason::Manual,
                ExitReason::SignalReversal
            ]
        );
    }
}
