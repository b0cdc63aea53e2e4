//! CSV file data adapter.
//!
//! Column names are matched case-insensitively against common aliases, and
//! timestamps may be datetime strings, plain dates, or epoch seconds or
//! milliseconds. Bars are sorted by time and validated before they leave
//! the adapter.

use crate::domain::error::AdaptraderError;
use crate::domain::ohlcv::{validate_bars, OhlcvBar};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "time", "date", "t"];
const OPEN_ALIASES: &[&str] = &["open", "o"];
const HIGH_ALIASES: &[&str] = &["high", "h"];
const LOW_ALIASES: &[&str] = &["low", "l"];
const CLOSE_ALIASES: &[&str] = &["close", "c"];
const VOLUME_ALIASES: &[&str] = &["volume", "v"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    /// `path` is either one CSV file or a directory of `<symbol>.csv` files,
    /// with `/` in the symbol replaced by `_`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}.csv", symbol.replace('/', "_")))
        } else {
            self.path.clone()
        }
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, AdaptraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| AdaptraderError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let bars = parse_bars(&content)?;
        debug!(symbol, path = %path.display(), bars = bars.len(), "loaded bars");
        Ok(bars)
    }
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, AdaptraderError> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()))
        };
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| AdaptraderError::DataSource {
                reason: format!("missing {} column", aliases[0]),
            })
        };
        Ok(Columns {
            timestamp: require(TIMESTAMP_ALIASES)?,
            open: require(OPEN_ALIASES)?,
            high: require(HIGH_ALIASES)?,
            low: require(LOW_ALIASES)?,
            close: require(CLOSE_ALIASES)?,
            volume: find(VOLUME_ALIASES),
        })
    }
}

/// Parse CSV text into sorted, validated bars. A missing volume column reads as zero volume.
pub fn parse_bars(content: &str) -> Result<Vec<OhlcvBar>, AdaptraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut bars = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let line = row + 2;

        let number = |idx: usize, name: &str| -> Result<f64, AdaptraderError> {
            let raw = record.get(idx).ok_or_else(|| AdaptraderError::DataSource {
                reason: format!("line {line}: missing {name} value"),
            })?;
            raw.parse::<f64>().map_err(|e| AdaptraderError::DataSource {
                reason: format!("line {line}: invalid {name} value '{raw}': {e}"),
            })
        };

        let raw_ts = record
            .get(columns.timestamp)
            .ok_or_else(|| AdaptraderError::DataSource {
                reason: format!("line {line}: missing timestamp"),
            })?;
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| AdaptraderError::DataSource {
            reason: format!("line {line}: unrecognised timestamp '{raw_ts}'"),
        })?;

        bars.push(OhlcvBar {
            timestamp,
            open: number(columns.open, "open")?,
            high: number(columns.high, "high")?,
            low: number(columns.low, "low")?,
            close: number(columns.close, "close")?,
            volume: match columns.volume {
                Some(idx) => number(idx, "volume")?,
                None => 0.0,
            },
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    validate_bars(&bars)?;
    Ok(bars)
}

/// Datetime string, RFC 3339, plain date, or epoch seconds/milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(epoch) = raw.parse::<i64>() {
        let dt = if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return dt.map(|d| d.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_standard_headers() {
        let csv = "timestamp,open,high,low,close,volume\n\
            2024-01-15 00:00:00,100.0,110.0,90.0,105.0,50000\n\
            2024-01-15 01:00:00,105.0,115.0,100.0,110.0,60000\n";
        let bars = parse_bars(csv).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, ts(2024, 1, 15, 0));
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[1].volume, 60000.0);
    }

    #[test]
    fn normalises_short_aliases_and_column_order() {
        let csv = "C,V,T,O,H,L\n105,10,2024-01-15T03:00:00,100,110,90\n";
        let bars = parse_bars(csv).unwrap();
        assert_eq!(bars[0].timestamp, ts(2024, 1, 15, 3));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 10.0);
    }

    #[test]
    fn missing_volume_column_reads_zero() {
        let bars = parse_bars("date,open,high,low,close\n2024-01-15,1,2,0.5,1.5\n").unwrap();
        assert_eq!(bars[0].volume, 0.0);
        assert_eq!(bars[0].timestamp, ts(2024, 1, 15, 0));
    }

    #[test]
    fn sorts_rows_by_time() {
        let csv = "time,open,high,low,close,volume\n\
            1705284000,2,2,2,2,1\n\
            1705280400,1,1,1,1,1\n";
        let bars = parse_bars(csv).unwrap();
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert_eq!(bars[0].close, 1.0);
    }

    #[test]
    fn epoch_seconds_and_millis_agree() {
        assert_eq!(parse_timestamp("1705276800"), Some(ts(2024, 1, 15, 0)));
        assert_eq!(parse_timestamp("1705276800000"), Some(ts(2024, 1, 15, 0)));
        assert_eq!(parse_timestamp("2024-01-15T00:00:00Z"), Some(ts(2024, 1, 15, 0)));
        assert_eq!(parse_timestamp("15/01/2024"), None);
    }

    #[test]
    fn missing_close_column_is_data_source_error() {
        let err = parse_bars("date,open,high,low\n2024-01-15,1,2,0.5\n").unwrap_err();
        assert!(matches!(err, AdaptraderError::DataSource { reason } if reason.contains("close")));
    }

    #[test]
    fn non_numeric_price_names_the_line() {
        let err = parse_bars("date,open,high,low,close\n2024-01-15,1,2,0.5,abc\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn invalid_bar_is_rejected_at_the_boundary() {
        let err = parse_bars("date,open,high,low,close\n2024-01-15,1,0.5,2,1\n").unwrap_err();
        assert!(matches!(err, AdaptraderError::InvalidInput { index: 0, .. }));
    }

    #[test]
    fn directory_lookup_uses_symbol_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BTC_USD.csv"),
            "date,open,high,low,close,volume\n2024-01-15,1,2,0.5,1.5,100\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.fetch_bars("BTC/USD").unwrap().len(), 1);
        assert!(matches!(
            adapter.fetch_bars("ETH/USD"),
            Err(AdaptraderError::DataSource { .. })
        ));
    }
}
