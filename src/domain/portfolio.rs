//! Portfolio ledger: positions, holdings and the equity curve.
//!
//! The [`Portfolio`] is the only owner of position and holdings state. It
//! mutates that state exclusively in response to events: signals become
//! orders through a [`SizingPolicy`], fills move cash and positions, and every
//! market event appends a marked-to-market snapshot.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::data_handler::DataHandler;
use super::event::{Event, FillEvent, OrderDirection, OrderEvent, SignalDirection, SignalEvent};
use super::metrics::Metrics;
use super::queue::EventQueue;

/// Turns an advisory signal into at most one order.
pub trait SizingPolicy {
    fn size_order(&self, signal: &SignalEvent, current_quantity: i64) -> Option<OrderEvent>;
}

/// Fixed `floor(100 * strength)` market orders with no risk management.
/// Entries only from flat, exits close the whole position.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveSizing;

const NAIVE_ORDER_SIZE: f64 = 100.0;

impl SizingPolicy for NaiveSizing {
    fn size_order(&self, signal: &SignalEvent, current_quantity: i64) -> Option<OrderEvent> {
        let symbol = signal.symbol.as_str();
        match signal.direction {
            SignalDirection::Long | SignalDirection::Short => {
                if current_quantity != 0 {
                    return None;
                }
                let sized = (NAIVE_ORDER_SIZE * signal.strength).floor();
                // positions are i64, so anything at or past 2^63 cannot be held
                if !sized.is_finite() || sized < 1.0 || sized >= i64::MAX as f64 {
                    return None;
                }
                let direction = if signal.direction == SignalDirection::Long {
                    OrderDirection::Buy
                } else {
                    OrderDirection::Sell
                };
                Some(OrderEvent::market(symbol, sized as u64, direction))
            }
            SignalDirection::Exit => match current_quantity {
                q if q > 0 => Some(OrderEvent::market(
                    symbol,
                    q.unsigned_abs(),
                    OrderDirection::Sell,
                )),
                q if q < 0 => Some(OrderEvent::market(
                    symbol,
                    q.unsigned_abs(),
                    OrderDirection::Buy,
                )),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub timestamp: NaiveDateTime,
    pub quantities: HashMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingsSnapshot {
    pub timestamp: NaiveDateTime,
    /// Dollar value per symbol.
    pub values: HashMap<String, f64>,
    pub cash: f64,
    pub commission: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Holdings {
    values: HashMap<String, f64>,
    cash: f64,
    commission: f64,
    total: f64,
}

/// Returns and cumulative equity derived from holdings snapshots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EquityCurve {
    pub timestamps: Vec<NaiveDateTime>,
    pub totals: Vec<f64>,
    /// Percent change of `totals`; one shorter than `totals`.
    pub returns: Vec<f64>,
    /// Running product of `1 + return`, starting at 1.0.
    pub equity: Vec<f64>,
}

impl EquityCurve {
    pub fn from_holdings(holdings: &[HoldingsSnapshot]) -> Self {
        let timestamps: Vec<NaiveDateTime> = holdings.iter().map(|h| h.timestamp).collect();
        let totals: Vec<f64> = holdings.iter().map(|h| h.total).collect();

        let returns: Vec<f64> = totals
            .windows(2)
            .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
            .collect();

        let mut equity = Vec::with_capacity(totals.len());
        if !totals.is_empty() {
            equity.push(1.0);
        }
        for r in &returns {
            let prev = equity.last().copied().unwrap_or(1.0);
            equity.push(prev * (1.0 + r));
        }

        EquityCurve {
            timestamps,
            totals,
            returns,
            equity,
        }
    }
}

pub struct Portfolio {
    symbols: Vec<String>,
    sizing: Box<dyn SizingPolicy>,
    positions: HashMap<String, i64>,
    holdings: Holdings,
    last_close: HashMap<String, f64>,
    all_positions: Vec<PositionSnapshot>,
    all_holdings: Vec<HoldingsSnapshot>,
    fills: usize,
}

impl Portfolio {
    pub fn new(
        symbols: &[String],
        start: NaiveDateTime,
        initial_capital: f64,
        sizing: Box<dyn SizingPolicy>,
    ) -> Self {
        let positions: HashMap<String, i64> = symbols.iter().map(|s| (s.clone(), 0)).collect();
        let holdings = Holdings {
            values: symbols.iter().map(|s| (s.clone(), 0.0)).collect(),
            cash: initial_capital,
            commission: 0.0,
            total: initial_capital,
        };

        let all_positions = vec![PositionSnapshot {
            timestamp: start,
            quantities: positions.clone(),
        }];
        let all_holdings = vec![HoldingsSnapshot {
            timestamp: start,
            values: holdings.values.clone(),
            cash: holdings.cash,
            commission: holdings.commission,
            total: holdings.total,
        }];

        Portfolio {
            symbols: symbols.to_vec(),
            sizing,
            positions,
            holdings,
            last_close: HashMap::new(),
            all_positions,
            all_holdings,
            fills: 0,
        }
    }

    pub fn naive(symbols: &[String], start: NaiveDateTime, initial_capital: f64) -> Self {
        Self::new(symbols, start, initial_capital, Box::new(NaiveSizing))
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn holding(&self, symbol: &str) -> f64 {
        self.holdings.values.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn cash(&self) -> f64 {
        self.holdings.cash
    }

    pub fn total(&self) -> f64 {
        self.holdings.total
    }

    pub fn commission(&self) -> f64 {
        self.holdings.commission
    }

    pub fn fill_count(&self) -> usize {
        self.fills
    }

    pub fn all_positions(&self) -> &[PositionSnapshot] {
        &self.all_positions
    }

    pub fn all_holdings(&self) -> &[HoldingsSnapshot] {
        &self.all_holdings
    }

    /// Size `signal` into an order and queue it. Signals for untracked
    /// symbols and degenerate sizes produce nothing.
    pub fn update_signal(&mut self, signal: &SignalEvent, queue: &mut EventQueue) {
        let Some(&current) = self.positions.get(&signal.symbol) else {
            warn!(symbol = %signal.symbol, "signal for untracked symbol ignored");
            return;
        };

        match self.sizing.size_order(signal, current) {
            Some(order) => {
                debug!(%order, "order generated");
                queue.push(Event::Order(order));
            }
            None => debug!(
                symbol = %signal.symbol,
                direction = ?signal.direction,
                position = current,
                "signal produced no order"
            ),
        }
    }

    /// Apply a fill to positions and holdings.
    pub fn update_fill(&mut self, fill: &FillEvent) {
        let Some(position) = self.positions.get_mut(&fill.symbol) else {
            warn!(symbol = %fill.symbol, "fill for untracked symbol ignored");
            return;
        };
        let updated = i64::try_from(fill.quantity)
            .ok()
            .and_then(|q| q.checked_mul(fill.direction.sign()))
            .and_then(|delta| position.checked_add(delta));
        let Some(updated) = updated else {
            warn!(
                symbol = %fill.symbol,
                quantity = fill.quantity,
                position = *position,
                "fill would overflow position, ignored"
            );
            return;
        };
        *position = updated;

        let cost = fill.signed_cost();
        *self.holdings.values.entry(fill.symbol.clone()).or_insert(0.0) += cost;
        self.holdings.commission += fill.commission;
        self.holdings.cash -= cost + fill.commission;
        self.holdings.total -= cost + fill.commission;
        self.fills += 1;

        debug!(
            symbol = %fill.symbol,
            direction = %fill.direction,
            quantity = fill.quantity,
            price = fill.fill_cost,
            commission = fill.commission,
            cash = self.holdings.cash,
            "fill applied"
        );
    }

    /// Append a position and holdings snapshot for the current bar, marking
    /// every position to its latest close. Does nothing until at least one
    /// symbol has a bar.
    pub fn update_timeindex(&mut self, bars: &dyn DataHandler) {
        let mut timestamp = None;
        for symbol in &self.symbols {
            if let Ok(Some(bar)) = bars.latest_bar(symbol) {
                timestamp.get_or_insert(bar.timestamp);
                self.last_close.insert(symbol.clone(), bar.close);
            }
        }
        let Some(timestamp) = timestamp else {
            return;
        };

        let mut values = HashMap::with_capacity(self.symbols.len());
        let mut market_value = 0.0;
        for symbol in &self.symbols {
            let quantity = self.position(symbol);
            let close = self.last_close.get(symbol).copied().unwrap_or(0.0);
            let value = quantity as f64 * close;
            market_value += value;
            values.insert(symbol.clone(), value);
        }

        self.holdings.values = values.clone();
        self.holdings.total = self.holdings.cash + market_value;

        self.all_positions.push(PositionSnapshot {
            timestamp,
            quantities: self.positions.clone(),
        });
        self.all_holdings.push(HoldingsSnapshot {
            timestamp,
            values,
            cash: self.holdings.cash,
            commission: self.holdings.commission,
            total: self.holdings.total,
        });
    }

    pub fn equity_curve(&self) -> EquityCurve {
        EquityCurve::from_holdings(&self.all_holdings)
    }

    pub fn summary(&self, periods_per_year: f64, risk_free_rate: f64) -> Metrics {
        Metrics::compute(&self.equity_curve(), periods_per_year, risk_free_rate)
    }
}
