#![allow(dead_code)]

use barflow::domain::bar::Bar;
use barflow::domain::error::BarflowError;
use barflow::ports::bar_port::BarPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

pub struct MockBarPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl BarPort for MockBarPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, BarflowError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BarflowError::DataLoad {
                source_name: "mock".into(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| {
                let d = b.timestamp.date();
                start.is_none_or(|s| d >= s) && end.is_none_or(|e| d <= e)
            })
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BarflowError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn ts(date: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp: ts(date),
        open: close - 1.0,
        low: close - 2.0,
        high: close + 1.0,
        close,
        volume: 1000,
        open_interest: 0,
    }
}

/// Consecutive January 2024 bars starting on the 2nd.
pub fn make_series(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, &format!("2024-01-{:02}", i + 2), close))
        .collect()
}

/// Write `<symbol>.csv` in the standard column layout.
pub fn write_symbol_csv(dir: &Path, symbol: &str, bars: &[Bar]) {
    let mut file = std::fs::File::create(dir.join(format!("{}.csv", symbol))).unwrap();
    writeln!(file, "datetime,open,low,high,close,volume,open_interest").unwrap();
    for b in bars {
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.low,
            b.high,
            b.close,
            b.volume,
            b.open_interest
        )
        .unwrap();
    }
}
