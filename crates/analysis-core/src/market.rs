//! Capability-set interfaces for the two external collaborators the core
//! depends on: a market-data adapter (`MarketAdapter`) and an indicator
//! calculation service (`IndicatorEngine`). Both are pure traits; concrete
//! implementations live in other crates (`market-adapter`, `technical-analysis`).

use crate::{AnalysisError, Bar, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FetchOhlcRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub count: usize,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// `FetchOHLC{symbol,timeframe,count,from?,to?} -> []Bar`, `GetPrice`,
/// `Search`, `ListPairs`. Honours a per-adapter hard bar limit (`max_limit`).
#[async_trait]
pub trait MarketAdapter: Send + Sync {
    /// Static per-call cap (`MAX_LIMIT`) this adapter enforces.
    fn max_limit(&self) -> usize;

    async fn fetch_ohlc(&self, request: FetchOhlcRequest) -> Result<Vec<Bar>, AnalysisError>;

    async fn get_price(&self, symbol: &str) -> Result<f64, AnalysisError>;

    async fn search(&self, query: &str) -> Result<Vec<String>, AnalysisError>;

    async fn list_pairs(&self) -> Result<Vec<String>, AnalysisError>;
}

/// Indicator identifiers the `IndicatorEngine` collaborator knows how to
/// compute. `Adx` and `Bb` are composite (see `IndicatorPoint::values`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Ema,
    Sma,
    Atr,
    Adx,
    Bb,
    BbWidth,
    Psar,
    Obv,
    Vwap,
    Rsi,
    Macd,
    EfficiencyRatio,
    Volume,
}

/// Per-indicator option map, e.g. `{period}` for ADX, `{period, std_dev}`
/// for Bollinger Bands, `{fast_period, slow_period, signal_period}` for MACD.
#[derive(Debug, Clone, Default)]
pub struct IndicatorConfig {
    pub period: Option<usize>,
    pub fast_period: Option<usize>,
    pub slow_period: Option<usize>,
    pub signal_period: Option<usize>,
    pub std_dev: Option<f64>,
}

impl IndicatorConfig {
    pub fn with_period(period: usize) -> Self {
        IndicatorConfig {
            period: Some(period),
            ..Default::default()
        }
    }
}

/// One sample of an indicator series, aligned to a candle open time.
/// Warmup/missing points are explicitly `None`, never omitted, so series
/// length always matches the requested bar count.
#[derive(Debug, Clone, Default)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
    pub values: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    pub data: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn last_value(&self) -> Option<f64> {
        self.data.last().and_then(|p| p.value)
    }

    pub fn last_values(&self) -> Option<&HashMap<String, f64>> {
        self.data.last().and_then(|p| p.values.as_ref())
    }

    pub fn last_named(&self, field: &str) -> Option<f64> {
        self.last_values().and_then(|v| v.get(field)).copied()
    }
}

#[derive(Debug, Clone)]
pub struct GetSeriesRequest {
    pub symbol: String,
    pub indicator: Indicator,
    pub timeframe: Timeframe,
    pub bars: Vec<Bar>,
    pub reference_date: Option<DateTime<Utc>>,
    pub config: IndicatorConfig,
}

/// `getSeries{symbol, indicator, timeframe, bars, referenceDate, config} ->
/// {data: ordered sequence of {timestamp, value | values}}`. The returned
/// series length must be at least the number of input bars.
#[async_trait]
pub trait IndicatorEngine: Send + Sync {
    async fn get_series(
        &self,
        request: GetSeriesRequest,
    ) -> Result<IndicatorSeries, AnalysisError>;
}
