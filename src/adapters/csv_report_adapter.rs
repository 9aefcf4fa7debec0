//! Equity curve CSV report.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::BarflowError;
use crate::ports::report_port::ReportPort;
use std::path::Path;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes one row per holdings snapshot:
/// `datetime, <symbols…>, cash, commission, total, returns, equity_curve`.
///
/// The first row has a zero return since there is no prior total.
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    fn csv_error(output_path: &Path, e: csv::Error) -> BarflowError {
        BarflowError::Io(std::io::Error::other(format!(
            "failed to write {}: {}",
            output_path.display(),
            e
        )))
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), BarflowError> {
        let mut wtr =
            csv::Writer::from_path(output_path).map_err(|e| Self::csv_error(output_path, e))?;

        let mut header = vec!["datetime".to_string()];
        header.extend(report.symbols.iter().cloned());
        header.extend(
            ["cash", "commission", "total", "returns", "equity_curve"]
                .iter()
                .map(|s| s.to_string()),
        );
        wtr.write_record(&header)
            .map_err(|e| Self::csv_error(output_path, e))?;

        for (i, snapshot) in report.holdings.iter().enumerate() {
            let ret = if i == 0 {
                0.0
            } else {
                report.curve.returns.get(i - 1).copied().unwrap_or(0.0)
            };
            let equity = report.curve.equity.get(i).copied().unwrap_or(f64::NAN);

            let mut row = vec![snapshot.timestamp.format(TIMESTAMP_FORMAT).to_string()];
            for symbol in &report.symbols {
                let value = snapshot.values.get(symbol).copied().unwrap_or(0.0);
                row.push(value.to_string());
            }
            row.push(snapshot.cash.to_string());
            row.push(snapshot.commission.to_string());
            row.push(snapshot.total.to_string());
            row.push(ret.to_string());
            row.push(equity.to_string());

            wtr.write_record(&row)
                .map_err(|e| Self::csv_error(output_path, e))?;
        }

        wtr.flush()?;
        info!(path = %output_path.display(), rows = report.holdings.len(), "wrote equity report");
        Ok(())
    }
}
