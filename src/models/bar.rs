//! Price bar model

use chrono::{DateTime, Utc};

/// One OHLC observation returned by the data provider
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
