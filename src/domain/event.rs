//! Events routed through the engine loop.
//!
//! Every stage of the pipeline communicates only through these types:
//! the data handler announces bars with [`MarketEvent`], strategies answer with
//! [`SignalEvent`], the portfolio sizes signals into [`OrderEvent`] and the
//! execution handler confirms them with [`FillEvent`].

use chrono::NaiveDateTime;
use std::fmt;

use super::execution::calculate_commission;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Market(_) => "MARKET",
            Event::Signal(_) => "SIGNAL",
            Event::Order(_) => "ORDER",
            Event::Fill(_) => "FILL",
        }
    }
}

/// A new bar is available for every tracked symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarketEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDirection {
    Long,
    Short,
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub direction: SignalDirection,
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MKT"),
            OrderType::Limit => write!(f, "LMT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Buy,
    Sell,
}

impl OrderDirection {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            OrderDirection::Buy => 1,
            OrderDirection::Sell => -1,
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Buy => write!(f, "BUY"),
            OrderDirection::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub symbol: String,
    pub order_type: OrderType,
    pub quantity: u64,
    pub direction: OrderDirection,
}

impl OrderEvent {
    pub fn market(symbol: &str, quantity: u64, direction: OrderDirection) -> Self {
        OrderEvent {
            symbol: symbol.to_string(),
            order_type: OrderType::Market,
            quantity,
            direction,
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order: Symbol={}, Type={}, Quantity={}, Direction={}",
            self.symbol, self.order_type, self.quantity, self.direction
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillEvent {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub exchange: String,
    pub quantity: u64,
    pub direction: OrderDirection,
    /// Per-share execution price.
    pub fill_cost: f64,
    pub commission: f64,
}

impl FillEvent {
    /// Build a fill; without an explicit commission the brokerage fee
    /// schedule in [`calculate_commission`] is applied.
    pub fn new(
        timestamp: NaiveDateTime,
        symbol: &str,
        exchange: &str,
        quantity: u64,
        direction: OrderDirection,
        fill_cost: f64,
        commission: Option<f64>,
    ) -> Self {
        let commission =
            commission.unwrap_or_else(|| calculate_commission(quantity, fill_cost));
        FillEvent {
            timestamp,
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            quantity,
            direction,
            fill_cost,
            commission,
        }
    }

    /// Signed notional: positive for buys, negative for sells.
    pub fn signed_cost(&self) -> f64 {
        self.direction.sign() as f64 * self.fill_cost * self.quantity as f64
    }
}
