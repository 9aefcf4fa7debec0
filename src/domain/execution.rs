//! Order execution and fill simulation.
//!
//! Implements the brokerage fee schedule and a simulated execution handler that
//! fills market orders at the latest close.

use tracing::{debug, warn};

use super::data_handler::DataHandler;
use super::event::{Event, FillEvent, OrderEvent};
use super::queue::EventQueue;

const SMALL_ORDER_SHARES: u64 = 500;
const SMALL_ORDER_RATE: f64 = 0.013;
const LARGE_ORDER_RATE: f64 = 0.008;
const MIN_COMMISSION: f64 = 1.30;
const MAX_COMMISSION_PCT: f64 = 0.5;

/// Per-share brokerage commission.
///
/// rate = 0.013/share up to 500 shares, 0.008/share above;
/// commission = max(1.30, rate * quantity), capped at 0.5% of notional.
/// Negative or non-finite prices count as zero notional, so the result is
/// never negative.
pub fn calculate_commission(quantity: u64, fill_cost: f64) -> f64 {
    let rate = if quantity <= SMALL_ORDER_SHARES {
        SMALL_ORDER_RATE
    } else {
        LARGE_ORDER_RATE
    };
    let shares = quantity as f64;
    let price = if fill_cost.is_finite() { fill_cost.max(0.0) } else { 0.0 };

    let commission = MIN_COMMISSION.max(rate * shares);
    commission.min(MAX_COMMISSION_PCT / 100.0 * shares * price)
}

pub trait ExecutionHandler {
    /// Turn an order into zero or one fills pushed onto `queue`.
    fn execute_order(&mut self, order: &OrderEvent, bars: &dyn DataHandler, queue: &mut EventQueue);
}

/// Fills every order in full at the symbol's latest close, with the fee
/// schedule applied.
#[derive(Debug, Clone)]
pub struct SimulatedExecution {
    exchange: String,
}

impl SimulatedExecution {
    pub fn new(exchange: &str) -> Self {
        SimulatedExecution {
            exchange: exchange.to_string(),
        }
    }
}

impl Default for SimulatedExecution {
    fn default() -> Self {
        Self::new("ARCA")
    }
}

impl ExecutionHandler for SimulatedExecution {
    fn execute_order(&mut self, order: &OrderEvent, bars: &dyn DataHandler, queue: &mut EventQueue) {
        let bar = match bars.latest_bar(&order.symbol) {
            Ok(Some(bar)) => bar,
            Ok(None) => {
                warn!(symbol = %order.symbol, "no price yet, order dropped");
                return;
            }
            Err(e) => {
                warn!(symbol = %order.symbol, error = %e, "order dropped");
                return;
            }
        };

        debug!(%order, price = bar.close, "simulated fill");
        queue.push(Event::Fill(FillEvent::new(
            bar.timestamp,
            &order.symbol,
            &self.exchange,
            order.quantity,
            order.direction,
            bar.close,
            None,
        )));
    }
}
