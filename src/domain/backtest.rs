//! Backtest engine and event loop.
//!
//! [`EngineConfig`] holds the run parameters; [`Backtest`] owns every
//! component and drives the "pump one bar, drain fully" loop.

use chrono::NaiveDate;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use super::data_handler::DataHandler;
use super::event::Event;
use super::execution::ExecutionHandler;
use super::metrics::Metrics;
use super::portfolio::{EquityCurve, HoldingsSnapshot, Portfolio};
use super::queue::EventQueue;
use super::strategy::Strategy;

/// Where the engine gets its bars from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// One `<SYMBOL>.csv` per symbol in a directory.
    Csv { data_dir: PathBuf },
    /// A running data server.
    Server { address: SocketAddr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub symbols: Vec<String>,
    pub source: DataSource,
    pub timeout: Duration,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub exchange: String,
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
    pub output: Option<PathBuf>,
}

/// Event counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BacktestSummary {
    pub bars: usize,
    pub signals: usize,
    pub orders: usize,
    pub fills: usize,
    /// Every event that passed through the queue, bars included.
    pub events: usize,
}

/// Everything a report needs from a finished run.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub symbols: Vec<String>,
    pub holdings: Vec<HoldingsSnapshot>,
    pub curve: EquityCurve,
    pub metrics: Metrics,
}

pub struct Backtest {
    data: Box<dyn DataHandler>,
    strategy: Box<dyn Strategy>,
    portfolio: Portfolio,
    execution: Box<dyn ExecutionHandler>,
    queue: EventQueue,
    summary: BacktestSummary,
}

impl Backtest {
    pub fn new(
        data: Box<dyn DataHandler>,
        strategy: Box<dyn Strategy>,
        portfolio: Portfolio,
        execution: Box<dyn ExecutionHandler>,
    ) -> Self {
        Backtest {
            data,
            strategy,
            portfolio,
            execution,
            queue: EventQueue::new(),
            summary: BacktestSummary::default(),
        }
    }

    /// Run until the data handler is exhausted.
    ///
    /// Each iteration reveals one bar and then drains the queue completely,
    /// so all signals, orders and fills caused by bar `t` are settled before
    /// bar `t + 1` is revealed.
    pub fn run(&mut self) -> BacktestSummary {
        info!(
            strategy = self.strategy.name(),
            symbols = self.data.symbols().len(),
            "backtest started"
        );

        loop {
            if !self.data.continue_backtest() {
                break;
            }
            self.data.update_bars(&mut self.queue);

            while let Some(event) = self.queue.pop() {
                self.dispatch(event);
            }
        }

        self.summary.events = self.queue.total_pushed();
        info!(
            bars = self.summary.bars,
            signals = self.summary.signals,
            orders = self.summary.orders,
            fills = self.summary.fills,
            events = self.summary.events,
            "backtest finished"
        );
        self.summary
    }

    fn dispatch(&mut self, event: Event) {
        debug!(kind = event.kind(), "dispatching event");
        match event {
            Event::Market(market) => {
                self.summary.bars += 1;
                self.strategy
                    .calculate_signals(&market, self.data.as_ref(), &mut self.queue);
                self.portfolio.update_timeindex(self.data.as_ref());
            }
            Event::Signal(signal) => {
                self.summary.signals += 1;
                self.portfolio.update_signal(&signal, &mut self.queue);
            }
            Event::Order(order) => {
                self.summary.orders += 1;
                self.execution
                    .execute_order(&order, self.data.as_ref(), &mut self.queue);
            }
            Event::Fill(fill) => {
                self.summary.fills += 1;
                self.portfolio.update_fill(&fill);
            }
        }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn summary(&self) -> BacktestSummary {
        self.summary
    }

    pub fn report(&self, periods_per_year: f64, risk_free_rate: f64) -> BacktestReport {
        let curve = self.portfolio.equity_curve();
        let metrics = Metrics::compute(&curve, periods_per_year, risk_free_rate);
        BacktestReport {
            symbols: self.portfolio.symbols().to_vec(),
            holdings: self.portfolio.all_holdings().to_vec(),
            curve,
            metrics,
        }
    }
}
