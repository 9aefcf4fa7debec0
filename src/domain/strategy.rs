//! Signal-generating strategies.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::data_handler::DataHandler;
use super::event::{Event, MarketEvent, SignalDirection, SignalEvent};
use super::queue::EventQueue;

pub trait Strategy {
    fn name(&self) -> &str;

    /// React to a new bar. Emits at most one signal per symbol per call.
    fn calculate_signals(
        &mut self,
        event: &MarketEvent,
        bars: &dyn DataHandler,
        queue: &mut EventQueue,
    );
}

/// Goes long every symbol on its first bar and never trades again.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    bought: HashMap<String, bool>,
}

impl BuyAndHold {
    pub fn new(symbols: &[String]) -> Self {
        BuyAndHold {
            bought: symbols.iter().map(|s| (s.clone(), false)).collect(),
        }
    }

    pub fn has_bought(&self, symbol: &str) -> bool {
        self.bought.get(symbol).copied().unwrap_or(false)
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn calculate_signals(
        &mut self,
        _event: &MarketEvent,
        bars: &dyn DataHandler,
        queue: &mut EventQueue,
    ) {
        for symbol in bars.symbols() {
            let bar = match bars.latest_bar(symbol) {
                Ok(Some(bar)) => bar,
                Ok(None) => continue,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "skipping symbol");
                    continue;
                }
            };

            if self.has_bought(symbol) {
                continue;
            }

            debug!(symbol = %symbol, timestamp = %bar.timestamp, "buy and hold entry signal");
            queue.push(Event::Signal(SignalEvent {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
                direction: SignalDirection::Long,
                strength: 1.0,
            }));
            self.bought.insert(symbol.clone(), true);
        }
    }
}
