//! Configuration validation.
//!
//! Validates all config fields before anything is loaded or bound.

use crate::domain::error::BarflowError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::net::SocketAddr;

pub const ENGINE: &str = "engine";
pub const SERVER: &str = "server";
pub const LOGGING: &str = "logging";

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    validate_symbols(config)?;
    validate_initial_capital(config)?;
    validate_source(config)?;
    validate_dates(config)?;
    validate_periods(config)?;
    validate_risk_free_rate(config)?;
    validate_timeout(config, ENGINE)?;
    validate_logging_config(config)?;
    Ok(())
}

pub fn validate_server_config(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    if let Some(listen) = config.get_string(SERVER, "listen") {
        parse_address(&listen, SERVER, "listen")?;
    }
    validate_timeout(config, SERVER)?;
    validate_logging_config(config)?;
    Ok(())
}

pub fn validate_logging_config(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    if let Some(level) = config.get_string(LOGGING, "level") {
        let level = level.trim().to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(BarflowError::config_invalid(
                LOGGING,
                "level",
                format!("unknown level '{}', expected one of {}", level, LOG_LEVELS.join(", ")),
            ));
        }
    }
    Ok(())
}

/// Upper-cased symbol list; rejects empty lists and duplicates.
pub fn parse_symbols(config: &dyn ConfigPort) -> Result<Vec<String>, BarflowError> {
    let raw = config.get_list(ENGINE, "symbols");
    if raw.is_empty() {
        return Err(BarflowError::config_missing(ENGINE, "symbols"));
    }

    let mut seen = HashSet::new();
    let mut symbols = Vec::with_capacity(raw.len());
    for symbol in raw {
        let symbol = symbol.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(BarflowError::config_invalid(
                ENGINE,
                "symbols",
                format!("duplicate symbol {}", symbol),
            ));
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}

pub fn parse_address(value: &str, section: &str, key: &str) -> Result<SocketAddr, BarflowError> {
    value.trim().parse().map_err(|_| {
        BarflowError::config_invalid(section, key, format!("invalid socket address '{}'", value))
    })
}

pub fn parse_optional_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDate>, BarflowError> {
    match config.get_string(ENGINE, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                BarflowError::config_invalid(
                    ENGINE,
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    parse_symbols(config).map(|_| ())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    let value = config.get_double(ENGINE, "initial_capital", 100_000.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(BarflowError::config_invalid(
            ENGINE,
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    let source = config
        .get_string(ENGINE, "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => Ok(()),
        "server" => {
            let address = config
                .get_string(ENGINE, "server")
                .unwrap_or_else(|| "127.0.0.1:5555".to_string());
            parse_address(&address, ENGINE, "server").map(|_| ())
        }
        other => Err(BarflowError::config_invalid(
            ENGINE,
            "source",
            format!("unknown source '{}', expected csv or server", other),
        )),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    let start = parse_optional_date(config, "start_date")?;
    let end = parse_optional_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(BarflowError::config_invalid(
                ENGINE,
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    let value = config.get_double(ENGINE, "periods_per_year", 252.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(BarflowError::config_invalid(
            ENGINE,
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), BarflowError> {
    let value = config.get_double(ENGINE, "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(BarflowError::config_invalid(
            ENGINE,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_timeout(config: &dyn ConfigPort, section: &str) -> Result<(), BarflowError> {
    let value = config.get_int(section, "timeout_secs", 30);
    if value < 0 {
        return Err(BarflowError::config_invalid(
            section,
            "timeout_secs",
            "timeout_secs must be non-negative",
        ));
    }
    Ok(())
}
