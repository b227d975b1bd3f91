use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV record. `timestamp` is epoch seconds (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}
