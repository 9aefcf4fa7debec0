//! CSV directory bar source.
//!
//! One `<SYMBOL>.csv` per symbol with a header row and the columns
//! `datetime, open, low, high, close, volume, open_interest`.

use crate::domain::bar::Bar;
use crate::domain::error::BarflowError;
use crate::ports::bar_port::BarPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

pub struct CsvAdapter {
    data_dir: PathBuf,
}

impl CsvAdapter {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol))
    }

    fn load_error(&self, path: &std::path::Path, reason: impl Into<String>) -> BarflowError {
        BarflowError::DataLoad {
            source_name: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_field<T: FromStr>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| format!("missing {} column", name))?
        .trim()
        .parse()
        .map_err(|e| format!("invalid {} value: {}", name, e))
}

impl BarPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, BarflowError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| self.load_error(&path, format!("failed to read: {}", e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.load_error(&path, format!("CSV parse error: {}", e)))?;
            let row_error = |reason: String| self.load_error(&path, format!("row {}: {}", row + 1, reason));

            let raw_ts = record
                .get(0)
                .ok_or_else(|| row_error("missing datetime column".into()))?;
            let timestamp = parse_timestamp(raw_ts)
                .ok_or_else(|| row_error(format!("invalid datetime '{}'", raw_ts)))?;

            let date = timestamp.date();
            if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
                continue;
            }

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: parse_field(&record, 1, "open").map_err(row_error)?,
                low: parse_field(&record, 2, "low").map_err(row_error)?,
                high: parse_field(&record, 3, "high").map_err(row_error)?,
                close: parse_field(&record, 4, "close").map_err(row_error)?,
                volume: parse_field(&record, 5, "volume").map_err(row_error)?,
                open_interest: parse_field(&record, 6, "open_interest").map_err(row_error)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!(symbol, path = %path.display(), bars = bars.len(), "read csv");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BarflowError> {
        let entries = fs::read_dir(&self.data_dir)
            .map_err(|e| self.load_error(&self.data_dir, format!("failed to read directory: {}", e)))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.load_error(&self.data_dir, format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "datetime,open,low,high,close,volume,open_interest\n";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        // deliberately out of order
        let content = format!(
            "{HEADER}\
            2024-01-16,105.0,100.0,115.0,110.0,60000,0\n\
            2024-01-15,100.0,90.0,110.0,105.0,50000,0\n\
            2024-01-17 00:00:00,110.0,105.0,120.0,115.0,55000,12\n"
        );
        fs::write(path.join("AAPL.csv"), content).unwrap();
        fs::write(path.join("MSFT.csv"), HEADER).unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_bars_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("AAPL", None, None).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, date(15).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[2].open_interest, 12);
        assert!(bars.iter().all(|b| b.symbol == "AAPL"));
    }

    #[test]
    fn fetch_bars_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("AAPL", Some(date(16)), Some(date(16))).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 110.0);

        let bars = adapter.fetch_bars("AAPL", Some(date(16)), None).unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn fetch_bars_header_only_is_empty() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.fetch_bars("MSFT", None, None).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_load_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_bars("XYZ", None, None);
        assert!(matches!(result, Err(BarflowError::DataLoad { .. })));
    }

    #[test]
    fn malformed_row_is_load_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            format!("{HEADER}2024-01-15,abc,90.0,110.0,105.0,50000,0\n"),
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_bars("BAD", None, None).unwrap_err();
        assert!(err.to_string().contains("invalid open value"));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2024-01-15 09:30:00"),
            date(15).and_hms_opt(9, 30, 0)
        );
        assert_eq!(parse_timestamp("2024-01-15"), date(15).and_hms_opt(0, 0, 0));
        assert_eq!(parse_timestamp("15/01/2024"), None);
    }
}
