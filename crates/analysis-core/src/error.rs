use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("invalid timeframe {raw:?}: expected ^\\d+[mhdwM]$")]
    InvalidTimeframe { raw: String },

    #[error("{symbol} {timeframe}: insufficient history (have {available}, need {requested})")]
    InsufficientHistory {
        symbol: String,
        timeframe: String,
        available: usize,
        requested: usize,
    },

    #[error("{symbol} {timeframe}: upstream adapter failure: {source}")]
    AdapterFailure {
        symbol: String,
        timeframe: String,
        source: String,
    },

    #[error("{symbol}: request timed out after {elapsed_ms}ms")]
    Timeout { symbol: String, elapsed_ms: u64 },

    #[error("invalid bar for {symbol} {timeframe} at {timestamp}: {reason}")]
    InvalidBar {
        symbol: String,
        timeframe: String,
        timestamp: i64,
        reason: String,
    },
}
