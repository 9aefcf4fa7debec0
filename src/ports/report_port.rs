//! Report generation port trait.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::BarflowError;
use std::path::Path;

/// Port for writing the results of a finished run.
pub trait ReportPort {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), BarflowError>;
}
