//! CSV file data adapter.
//!
//! Reads one file with a header row. Columns are matched by name, case
//! insensitively: a timestamp column (`datetime`, `date`, `time` or
//! `timestamp`), `open`, `high`, `low`, `close`, and optionally `volume` and
//! `symbol`.

use crate::domain::error::FractalTraderError;
use crate::domain::ohlcv::{Bar, validate_bars};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const TIMESTAMP_COLUMNS: [&str; 4] = ["datetime", "date", "time", "timestamp"];

pub struct CsvAdapter {
    path: PathBuf,
}

struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    symbol: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, FractalTraderError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| names.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| FractalTraderError::Data {
                reason: format!("missing {} column", name),
            })
        };

        Ok(Columns {
            timestamp: TIMESTAMP_COLUMNS
                .iter()
                .find_map(|&name| find(name))
                .ok_or_else(|| FractalTraderError::Data {
                    reason: "missing datetime column".into(),
                })?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
            symbol: find("symbol"),
        })
    }
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, FractalTraderError> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| FractalTraderError::Data {
            reason: format!("invalid timestamp '{}'", value),
        })
}

fn parse_price(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<f64, FractalTraderError> {
    let raw = record.get(index).ok_or_else(|| FractalTraderError::Data {
        reason: format!("line {}: missing {} value", line, name),
    })?;
    raw.trim().parse().map_err(|e| FractalTraderError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: Option<&str>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, FractalTraderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| FractalTraderError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| FractalTraderError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;
        if symbol.is_some() && columns.symbol.is_none() {
            return Err(FractalTraderError::Data {
                reason: "symbol filter given but the file has no symbol column".into(),
            });
        }

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| FractalTraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            if let (Some(wanted), Some(index)) = (symbol, columns.symbol) {
                if record.get(index).map(str::trim) != Some(wanted) {
                    continue;
                }
            }

            let timestamp = parse_timestamp(record.get(columns.timestamp).unwrap_or_default())?;
            if start.is_some_and(|s| timestamp < s) || end.is_some_and(|e| timestamp > e) {
                continue;
            }

            let volume = match columns.volume {
                Some(index) if record.get(index).is_some_and(|v| !v.trim().is_empty()) => {
                    Some(parse_price(&record, index, "volume", line)?)
                }
                _ => None,
            };

            bars.push(Bar {
                timestamp,
                open: parse_price(&record, columns.open, "open", line)?,
                high: parse_price(&record, columns.high, "high", line)?,
                low: parse_price(&record, columns.low, "low", line)?,
                close: parse_price(&record, columns.close, "close", line)?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        validate_bars(&bars)?;
        tracing::debug!(path = %self.path.display(), bars = bars.len(), "loaded bars");
        Ok(bars)
    }
}
