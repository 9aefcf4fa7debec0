//! Per-symbol bar series and the shared timeline used to advance all symbols
//! in lockstep.

use crate::domain::bar::Bar;
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct SymbolSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub timestamp_index: HashMap<NaiveDateTime, usize>,
}

impl SymbolSeries {
    pub fn new(symbol: String, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        let timestamp_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.timestamp, i))
            .collect();
        Self {
            symbol,
            bars,
            timestamp_index,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_bar(&self, timestamp: NaiveDateTime) -> Option<&Bar> {
        self.timestamp_index.get(&timestamp).map(|&i| &self.bars[i])
    }

    /// Project this series onto `timeline`, padding gaps with the most recent
    /// earlier bar. Slots before the first bar stay empty.
    pub fn align_to(&self, timeline: &[NaiveDateTime]) -> Vec<Option<Bar>> {
        let mut last: Option<&Bar> = None;
        timeline
            .iter()
            .map(|&ts| match self.get_bar(ts) {
                Some(bar) => {
                    last = Some(bar);
                    Some(bar.clone())
                }
                None => last.map(|prev| prev.carried_to(ts)),
            })
            .collect()
    }
}

/// Sorted union of every timestamp seen across `series`.
pub fn build_unified_timeline(series: &[SymbolSeries]) -> Vec<NaiveDateTime> {
    let unique: BTreeSet<NaiveDateTime> = series
        .iter()
        .flat_map(|s| s.bars.iter().map(|bar| bar.timestamp))
        .collect();
    unique.into_iter().collect()
}
