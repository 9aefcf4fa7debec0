//! Market data handlers.
//!
//! A [`DataHandler`] drip-feeds bars to the rest of the engine: each call to
//! [`DataHandler::update_bars`] reveals one more bar per symbol and announces
//! it with a [`MarketEvent`]. Consumers only ever see bars that have already
//! been revealed, which is what keeps a backtest free of lookahead.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tracing::{debug, info};

use super::bar::Bar;
use super::error::BarflowError;
use super::event::{Event, MarketEvent};
use super::queue::EventQueue;
use super::timeline::{SymbolSeries, build_unified_timeline};
use crate::ports::bar_port::BarPort;

pub trait DataHandler {
    /// Symbols tracked by this handler, in configuration order.
    fn symbols(&self) -> &[String];

    /// The last `n` bars revealed for `symbol`, oldest first. Returns fewer
    /// than `n` while history is short and an empty slice before the first
    /// bar.
    fn latest_bars(&self, symbol: &str, n: usize) -> Result<&[Bar], BarflowError>;

    /// Reveal the next bar for every symbol and push a market event, or clear
    /// the continuation flag once the feed is exhausted.
    fn update_bars(&mut self, queue: &mut EventQueue);

    fn continue_backtest(&self) -> bool;

    fn latest_bar(&self, symbol: &str) -> Result<Option<&Bar>, BarflowError> {
        Ok(self.latest_bars(symbol, 1)?.last())
    }
}

/// Replays pre-loaded histories aligned onto a shared timeline.
#[derive(Debug)]
pub struct HistoricDataHandler {
    symbols: Vec<String>,
    aligned: HashMap<String, Vec<Option<Bar>>>,
    latest: HashMap<String, Vec<Bar>>,
    cursor: usize,
    steps: usize,
    first_timestamp: Option<NaiveDateTime>,
    continue_backtest: bool,
}

impl HistoricDataHandler {
    /// Build from in-memory series. Symbol order follows `series`.
    pub fn new(series: Vec<SymbolSeries>) -> Self {
        let timeline = build_unified_timeline(&series);
        let symbols: Vec<String> = series.iter().map(|s| s.symbol.clone()).collect();
        let aligned = series
            .iter()
            .map(|s| (s.symbol.clone(), s.align_to(&timeline)))
            .collect();
        let latest = symbols.iter().map(|s| (s.clone(), Vec::new())).collect();

        HistoricDataHandler {
            symbols,
            aligned,
            latest,
            cursor: 0,
            steps: timeline.len(),
            first_timestamp: timeline.first().copied(),
            continue_backtest: true,
        }
    }

    /// Load every symbol through `port`. Any symbol that fails to load or has
    /// no bars in range aborts construction.
    pub fn from_port(
        port: &dyn BarPort,
        symbols: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, BarflowError> {
        let mut series = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let bars = port.fetch_bars(symbol, start, end)?;
            if bars.is_empty() {
                return Err(BarflowError::NoData {
                    symbol: symbol.clone(),
                });
            }
            let loaded = SymbolSeries::new(symbol.clone(), bars);
            debug!(symbol = %symbol, bars = loaded.bar_count(), "loaded bar history");
            series.push(loaded);
        }

        let handler = Self::new(series);
        info!(
            symbols = handler.symbols.len(),
            steps = handler.steps,
            "historic data handler ready"
        );
        Ok(handler)
    }

    /// Number of aligned steps in the feed.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Timestamp of the first aligned step, if the feed has any.
    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.first_timestamp
    }
}

impl DataHandler for HistoricDataHandler {
    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn latest_bars(&self, symbol: &str, n: usize) -> Result<&[Bar], BarflowError> {
        let bars = self
            .latest
            .get(symbol)
            .ok_or_else(|| BarflowError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        let start = bars.len().saturating_sub(n);
        Ok(&bars[start..])
    }

    fn update_bars(&mut self, queue: &mut EventQueue) {
        if self.cursor >= self.steps {
            self.continue_backtest = false;
            return;
        }

        for symbol in &self.symbols {
            let next = self
                .aligned
                .get(symbol)
                .and_then(|slots| slots.get(self.cursor))
                .and_then(|slot| slot.as_ref());
            if let (Some(bar), Some(seen)) = (next, self.latest.get_mut(symbol)) {
                seen.push(bar.clone());
            }
        }

        self.cursor += 1;
        queue.push(Event::Market(MarketEvent));
    }

    fn continue_backtest(&self) -> bool {
        self.continue_backtest
    }
}
