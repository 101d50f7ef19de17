use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data. `timestamp` is the bar's open time; it closes at
/// `timestamp + timeframe.duration()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub vwap: Option<f64>,
}

impl Bar {
    /// Checks the OHLCV invariants: `low <= open,close <= high`, all values
    /// finite and non-negative.
    pub fn is_valid(&self) -> bool {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return false;
        }
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
            && self.low <= self.high
    }
}
