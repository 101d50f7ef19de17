use analysis_core::{Bar, Timeframe};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct LoadOhlcvRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub count: usize,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub reference_date: Option<DateTime<Utc>>,
    pub use_cache: Option<bool>,
    pub detect_gaps: Option<bool>,
}

impl LoadOhlcvRequest {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, count: usize) -> Self {
        LoadOhlcvRequest {
            symbol: symbol.into(),
            timeframe,
            count,
            from: None,
            to: None,
            reference_date: None,
            use_cache: None,
            detect_gaps: None,
        }
    }
}

/// One missing-intermediate-bars run, reported but not interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct Gap {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromCache {
    True,
    False,
    Partial,
    PartialDegraded,
}

#[derive(Debug, Clone)]
pub struct LoadOhlcvResult {
    pub bars: Vec<Bar>,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub count: usize,
    pub gaps: Vec<Gap>,
    pub gap_count: usize,
    pub from_cache: FromCache,
    pub load_duration_ms: u128,
    pub loaded_at: DateTime<Utc>,
    pub reference_date: Option<DateTime<Utc>>,
}
