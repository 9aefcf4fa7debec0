//! Bar source port trait.

use crate::domain::bar::Bar;
use crate::domain::error::BarflowError;
use chrono::NaiveDate;

/// Source of complete per-symbol bar histories.
///
/// `start`/`end` bound the inclusive date range; `None` leaves that side open.
pub trait BarPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, BarflowError>;

    fn list_symbols(&self) -> Result<Vec<String>, BarflowError>;
}
