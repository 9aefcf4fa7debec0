//! Price bar representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One OHLCV observation plus open interest for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub low: f64,
    pub high: f64,
    pub close: f64,
    pub volume: i64,
    pub open_interest: i64,
}

impl Bar {
    /// Copy of this bar stamped with a later timestamp, used when padding a
    /// symbol's series onto a shared timeline.
    pub fn carried_to(&self, timestamp: NaiveDateTime) -> Bar {
        Bar {
            timestamp,
            ..self.clone()
        }
    }
}
