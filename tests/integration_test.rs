//! End-to-end engine tests: data port → handler → strategy → portfolio →
//! execution, exercised through the public API.

mod common;

use approx::assert_relative_eq;
use barflow::domain::backtest::Backtest;
use barflow::domain::data_handler::{DataHandler, HistoricDataHandler};
use barflow::domain::error::BarflowError;
use barflow::domain::event::{Event, MarketEvent, SignalDirection, SignalEvent};
use barflow::domain::execution::SimulatedExecution;
use barflow::domain::portfolio::Portfolio;
use barflow::domain::queue::EventQueue;
use barflow::domain::strategy::{BuyAndHold, Strategy};
use chrono::NaiveDateTime;
use common::*;
use std::cell::RefCell;
use std::rc::Rc;

fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn engine(port: &MockBarPort, names: &[&str], strategy: Box<dyn Strategy>) -> Backtest {
    let symbols = symbols(names);
    let handler = HistoricDataHandler::from_port(port, &symbols, None, None).unwrap();
    let start = handler.first_timestamp().unwrap();
    Backtest::new(
        Box::new(handler),
        strategy,
        Portfolio::naive(&symbols, start, 100_000.0),
        Box::new(SimulatedExecution::default()),
    )
}

/// Alternates Long and Exit on every bar of every symbol.
struct FlipFlop {
    long_next: bool,
}

impl Strategy for FlipFlop {
    fn name(&self) -> &str {
        "flip_flop"
    }

    fn calculate_signals(&mut self, _: &MarketEvent, bars: &dyn DataHandler, queue: &mut EventQueue) {
        let direction = if self.long_next {
            SignalDirection::Long
        } else {
            SignalDirection::Exit
        };
        self.long_next = !self.long_next;
        for symbol in bars.symbols() {
            if let Ok(Some(bar)) = bars.latest_bar(symbol) {
                queue.push(Event::Signal(SignalEvent {
                    symbol: symbol.clone(),
                    timestamp: bar.timestamp,
                    direction,
                    strength: 1.0,
                }));
            }
        }
    }
}

/// Records the newest timestamp visible for each symbol on every call.
struct Spy {
    seen: Rc<RefCell<Vec<Vec<NaiveDateTime>>>>,
}

impl Strategy for Spy {
    fn name(&self) -> &str {
        "spy"
    }

    fn calculate_signals(&mut self, _: &MarketEvent, bars: &dyn DataHandler, _: &mut EventQueue) {
        let visible = bars
            .symbols()
            .iter()
            .flat_map(|s| bars.latest_bars(s, usize::MAX).unwrap().iter().map(|b| b.timestamp))
            .collect();
        self.seen.borrow_mut().push(visible);
    }
}

mod full_pipeline {
    use super::*;

    #[test]
    fn buy_and_hold_single_symbol() {
        let port = MockBarPort::new().with_bars("AAPL", make_series("AAPL", &[10.0, 11.0, 12.0, 9.0]));
        let mut backtest = engine(&port, &["AAPL"], Box::new(BuyAndHold::new(&symbols(&["AAPL"]))));

        let summary = backtest.run();
        assert_eq!(summary.bars, 4);
        assert_eq!(summary.fills, 1);

        let portfolio = backtest.portfolio();
        assert_eq!(portfolio.position("AAPL"), 100);
        assert_relative_eq!(portfolio.cash(), 100_000.0 - 1_000.0 - 1.3, max_relative = 1e-12);
        assert_relative_eq!(portfolio.total(), portfolio.cash() + 900.0, max_relative = 1e-12);

        let report = backtest.report(252.0, 0.0);
        assert_eq!(report.curve.equity.len(), 5);
        assert!(report.metrics.max_drawdown > 0.0);
    }

    #[test]
    fn multi_symbol_with_gap() {
        let mut msft = make_series("MSFT", &[20.0, 21.0, 22.0]);
        msft.remove(1);
        let port = MockBarPort::new()
            .with_bars("AAPL", make_series("AAPL", &[10.0, 11.0, 12.0]))
            .with_bars("MSFT", msft);
        let names = ["AAPL", "MSFT"];
        let mut backtest = engine(&port, &names, Box::new(BuyAndHold::new(&symbols(&names))));

        let summary = backtest.run();
        assert_eq!(summary.bars, 3);
        assert_eq!(summary.signals, 2);
        assert_eq!(backtest.portfolio().position("MSFT"), 100);
        assert_eq!(backtest.portfolio().all_holdings().len(), 4);
    }

    #[test]
    fn failing_symbol_aborts_construction() {
        let port = MockBarPort::new()
            .with_bars("AAPL", make_series("AAPL", &[10.0]))
            .with_error("MSFT", "disk on fire");
        let result = HistoricDataHandler::from_port(&port, &symbols(&["AAPL", "MSFT"]), None, None);
        assert!(matches!(result, Err(BarflowError::DataLoad { .. })));
    }

    #[test]
    fn empty_range_is_no_data() {
        let port = MockBarPort::new().with_bars("AAPL", make_series("AAPL", &[10.0, 11.0]));
        let result = HistoricDataHandler::from_port(
            &port,
            &symbols(&["AAPL"]),
            Some(date("2025-01-01")),
            None,
        );
        assert!(matches!(result, Err(BarflowError::NoData { ref symbol }) if symbol == "AAPL"));
    }
}

mod no_lookahead {
    use super::*;

    #[test]
    fn strategy_never_sees_future_bars() {
        let port = MockBarPort::new()
            .with_bars("AAPL", make_series("AAPL", &[1.0, 2.0, 3.0, 4.0]))
            .with_bars("MSFT", make_series("MSFT", &[5.0, 6.0, 7.0, 8.0]));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut backtest = engine(
            &port,
            &["AAPL", "MSFT"],
            Box::new(Spy {
                seen: Rc::clone(&seen),
            }),
        );
        backtest.run();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        for (step, visible) in seen.iter().enumerate() {
            let current = ts(&format!("2024-01-{:02}", step + 2));
            assert!(visible.iter().all(|t| *t <= current));
            // two symbols, step + 1 bars each
            assert_eq!(visible.len(), 2 * (step + 1));
        }
    }
}

mod buy_and_hold {
    use super::*;

    #[test]
    fn at_most_one_signal_per_symbol() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let port = MockBarPort::new()
            .with_bars("AAPL", make_series("AAPL", &closes[..20]))
            .with_bars("MSFT", make_series("MSFT", &closes[..20]));
        let names = ["AAPL", "MSFT"];
        let mut backtest = engine(&port, &names, Box::new(BuyAndHold::new(&symbols(&names))));

        let summary = backtest.run();
        assert_eq!(summary.signals, 2);
        assert_eq!(summary.orders, 2);
    }
}

mod ledger_invariants {
    use super::*;

    #[test]
    fn position_matches_signed_fills() {
        // L, E, L, E, L → +100 -100 +100 -100 +100
        let port = MockBarPort::new().with_bars("AAPL", make_series("AAPL", &[10.0, 11.0, 12.0, 13.0, 14.0]));
        let mut backtest = engine(&port, &["AAPL"], Box::new(FlipFlop { long_next: true }));

        let summary = backtest.run();
        assert_eq!(summary.fills, 5);
        assert_eq!(backtest.portfolio().position("AAPL"), 100);
        assert_eq!(backtest.portfolio().fill_count(), 5);
    }

    #[test]
    fn snapshot_total_is_cash_plus_market_value() {
        let port = MockBarPort::new()
            .with_bars("AAPL", make_series("AAPL", &[10.0, 11.0, 9.5, 13.0, 14.0]))
            .with_bars("MSFT", make_series("MSFT", &[50.0, 49.0, 51.0, 52.0, 48.0]));
        let mut backtest = engine(&port, &["AAPL", "MSFT"], Box::new(FlipFlop { long_next: true }));
        backtest.run();

        let portfolio = backtest.portfolio();
        let positions = portfolio.all_positions();
        let holdings = portfolio.all_holdings();
        assert_eq!(positions.len(), holdings.len());

        for snapshot in holdings {
            let market_value: f64 = snapshot.values.values().sum();
            assert_relative_eq!(snapshot.total, snapshot.cash + market_value, max_relative = 1e-12);
        }
    }

    #[test]
    fn commission_accumulates() {
        let port = MockBarPort::new().with_bars("AAPL", make_series("AAPL", &[10.0, 11.0, 12.0]));
        let mut backtest = engine(&port, &["AAPL"], Box::new(FlipFlop { long_next: true }));
        backtest.run();

        // three fills of 100 shares, 1.30 each
        assert_relative_eq!(backtest.portfolio().commission(), 3.9, max_relative = 1e-12);
    }
}
