//! CLI definition and dispatch for both executables.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::data_server::{DataServer, ServerConfig};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::remote_adapter::RemoteBarAdapter;
use crate::domain::backtest::{Backtest, BacktestReport, BacktestSummary, DataSource, EngineConfig};
use crate::domain::config_validation::{
    ENGINE, LOGGING, SERVER, parse_address, parse_optional_date, parse_symbols,
    validate_engine_config, validate_server_config,
};
use crate::domain::data_handler::HistoricDataHandler;
use crate::domain::error::BarflowError;
use crate::domain::execution::SimulatedExecution;
use crate::domain::portfolio::Portfolio;
use crate::domain::strategy::BuyAndHold;
use crate::ports::bar_port::BarPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::telemetry::{self, LoggingConfig};

pub const DEFAULT_ENGINE_CONFIG: &str = "barflow.ini";
pub const DEFAULT_SERVER_CONFIG: &str = "dataserver.ini";

const DEFAULT_LISTEN: &str = "127.0.0.1:5555";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_TIMEOUT_SECS: i64 = 30;

#[derive(Parser, Debug)]
#[command(name = "barflow", about = "Event-driven backtesting engine")]
pub struct Cli {
    /// Configuration file (defaults to ./barflow.ini)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a backtest (the default)
    Backtest {
        /// Write the equity report here, overriding [engine] output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check the configuration without loading data
    Validate,
    /// List the symbols available from the configured data source
    Symbols,
}

#[derive(Parser, Debug)]
#[command(name = "dataserver", about = "Serve historical bars over TCP")]
pub struct ServerCli {
    /// Configuration file (defaults to ./dataserver.ini)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    let command = cli.command.unwrap_or(Command::Backtest { output: None });
    let result = load_config(cli.config.as_deref(), DEFAULT_ENGINE_CONFIG).and_then(|config| {
        match command {
            Command::Backtest { output } => run_backtest_command(&config, output),
            Command::Validate => run_validate(&config),
            Command::Symbols => run_symbols(&config),
        }
    });
    finish(result)
}

pub fn run_server(cli: ServerCli) -> ExitCode {
    let result = load_config(cli.config.as_deref(), DEFAULT_SERVER_CONFIG).and_then(|config| {
        telemetry::init_logging(&build_logging_config(&config))?;
        let server_config = build_server_config(&config)?;
        let port = CsvAdapter::new(server_config.data_dir.clone());
        let server = DataServer::bind(server_config.listen, Box::new(port), server_config.timeout)?;
        eprintln!(
            "Serving {} on {}",
            server_config.data_dir.display(),
            server.local_addr()?
        );
        server.run()
    });
    finish(result)
}

fn finish(result: Result<(), BarflowError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// An explicit path must exist. Without one, `default_name` in the working
/// directory is used if present, otherwise every key takes its default.
pub fn load_config(
    path: Option<&Path>,
    default_name: &str,
) -> Result<FileConfigAdapter, BarflowError> {
    match path {
        Some(path) => FileConfigAdapter::from_file(path),
        None if Path::new(default_name).exists() => FileConfigAdapter::from_file(default_name),
        None => {
            eprintln!("warning: {} not found, using defaults", default_name);
            Ok(FileConfigAdapter::empty())
        }
    }
}

pub fn build_logging_config(config: &dyn ConfigPort) -> LoggingConfig {
    LoggingConfig {
        level: config
            .get_string(LOGGING, "level")
            .map(|l| l.trim().to_lowercase())
            .unwrap_or_else(|| "info".into()),
        file: config
            .get_string(LOGGING, "file")
            .filter(|f| !f.trim().is_empty())
            .map(PathBuf::from),
    }
}

fn timeout_secs(config: &dyn ConfigPort, section: &str) -> Duration {
    let secs = config.get_int(section, "timeout_secs", DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs.max(0) as u64)
}

pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, BarflowError> {
    validate_engine_config(config)?;

    let source = match config
        .get_string(ENGINE, "source")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        Some("server") => DataSource::Server {
            address: parse_address(
                &config
                    .get_string(ENGINE, "server")
                    .unwrap_or_else(|| DEFAULT_LISTEN.into()),
                ENGINE,
                "server",
            )?,
        },
        _ => DataSource::Csv {
            data_dir: PathBuf::from(
                config
                    .get_string(ENGINE, "data_dir")
                    .unwrap_or_else(|| DEFAULT_DATA_DIR.into()),
            ),
        },
    };

    Ok(EngineConfig {
        symbols: parse_symbols(config)?,
        source,
        timeout: timeout_secs(config, ENGINE),
        start_date: parse_optional_date(config, "start_date")?,
        end_date: parse_optional_date(config, "end_date")?,
        initial_capital: config.get_double(ENGINE, "initial_capital", 100_000.0),
        exchange: config
            .get_string(ENGINE, "exchange")
            .unwrap_or_else(|| "ARCA".into()),
        periods_per_year: config.get_double(ENGINE, "periods_per_year", 252.0),
        risk_free_rate: config.get_double(ENGINE, "risk_free_rate", 0.0),
        output: config
            .get_string(ENGINE, "output")
            .filter(|o| !o.trim().is_empty())
            .map(PathBuf::from),
    })
}

pub fn build_server_config(config: &dyn ConfigPort) -> Result<ServerConfig, BarflowError> {
    validate_server_config(config)?;
    Ok(ServerConfig {
        listen: parse_address(
            &config
                .get_string(SERVER, "listen")
                .unwrap_or_else(|| DEFAULT_LISTEN.into()),
            SERVER,
            "listen",
        )?,
        data_dir: PathBuf::from(
            config
                .get_string(SERVER, "data_dir")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.into()),
        ),
        timeout: timeout_secs(config, SERVER),
    })
}

pub fn open_bar_port(source: &DataSource, timeout: Duration) -> Box<dyn BarPort> {
    match source {
        DataSource::Csv { data_dir } => Box::new(CsvAdapter::new(data_dir.clone())),
        DataSource::Server { address } => Box::new(RemoteBarAdapter::new(*address, timeout)),
    }
}

/// Load data, run buy-and-hold to completion and compute the report.
pub fn run_backtest(
    engine: &EngineConfig,
) -> Result<(BacktestSummary, BacktestReport), BarflowError> {
    let port = open_bar_port(&engine.source, engine.timeout);
    let handler = HistoricDataHandler::from_port(
        port.as_ref(),
        &engine.symbols,
        engine.start_date,
        engine.end_date,
    )?;

    let start = engine
        .start_date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .or(handler.first_timestamp())
        .ok_or_else(|| BarflowError::NoData {
            symbol: engine.symbols.join(","),
        })?;

    let mut backtest = Backtest::new(
        Box::new(handler),
        Box::new(BuyAndHold::new(&engine.symbols)),
        Portfolio::naive(&engine.symbols, start, engine.initial_capital),
        Box::new(SimulatedExecution::new(&engine.exchange)),
    );
    let summary = backtest.run();
    let report = backtest.report(engine.periods_per_year, engine.risk_free_rate);
    Ok((summary, report))
}

fn run_backtest_command(
    config: &FileConfigAdapter,
    output: Option<PathBuf>,
) -> Result<(), BarflowError> {
    telemetry::init_logging(&build_logging_config(config))?;

    let mut engine = build_engine_config(config)?;
    if output.is_some() {
        engine.output = output;
    }

    eprintln!("Running buy-and-hold on {} symbols...", engine.symbols.len());
    let (summary, report) = run_backtest(&engine)?;

    println!(
        "Bars: {}  Signals: {}  Orders: {}  Fills: {}",
        summary.bars, summary.signals, summary.orders, summary.fills
    );
    print_metrics(&report);

    if let Some(path) = &engine.output {
        CsvReportAdapter.write(&report, path)?;
        eprintln!("Equity report written to {}", path.display());
    }
    Ok(())
}

pub fn print_metrics(report: &BacktestReport) {
    for (label, value) in report.metrics.summary_rows() {
        println!("{:<20} {}", label, value);
    }
}

fn run_validate(config: &FileConfigAdapter) -> Result<(), BarflowError> {
    let engine = build_engine_config(config)?;
    let source = match &engine.source {
        DataSource::Csv { data_dir } => format!("csv ({})", data_dir.display()),
        DataSource::Server { address } => format!("server ({})", address),
    };
    println!("Configuration is valid");
    println!("  symbols: {}", engine.symbols.join(", "));
    println!("  source:  {}", source);
    println!("  capital: {:.2}", engine.initial_capital);
    Ok(())
}

fn run_symbols(config: &FileConfigAdapter) -> Result<(), BarflowError> {
    telemetry::init_logging(&build_logging_config(config))?;

    let engine = build_engine_config(config)?;
    let port = open_bar_port(&engine.source, engine.timeout);
    for symbol in port.list_symbols()? {
        println!("{}", symbol);
    }
    Ok(())
}
