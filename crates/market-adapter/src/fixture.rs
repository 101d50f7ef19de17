//! `FixtureAdapter`: an in-memory `MarketAdapter` for exercising
//! `data-provider`/`regime-engine` without a live API — seeded bars are
//! served back in closed-range slices, honoring a configurable `max_limit`
//! so batching logic has something real to chunk against.

use analysis_core::{AnalysisError, Bar, FetchOhlcRequest, MarketAdapter};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FixtureAdapter {
    bars: Mutex<HashMap<String, Vec<Bar>>>,
    max_limit: usize,
    price: Mutex<HashMap<String, f64>>,
}

impl FixtureAdapter {
    pub fn new(max_limit: usize) -> Self {
        FixtureAdapter {
            bars: Mutex::new(HashMap::new()),
            max_limit,
            price: Mutex::new(HashMap::new()),
        }
    }

    fn key(symbol: &str, timeframe: analysis_core::Timeframe) -> String {
        format!("{symbol}:{timeframe}")
    }

    pub fn seed(&self, symbol: &str, timeframe: analysis_core::Timeframe, bars: Vec<Bar>) {
        self.bars
            .lock()
            .unwrap()
            .insert(Self::key(symbol, timeframe), bars);
    }

    pub fn seed_price(&self, symbol: &str, price: f64) {
        self.price.lock().unwrap().insert(symbol.to_string(), price);
    }
}

#[async_trait::async_trait]
impl MarketAdapter for FixtureAdapter {
    fn max_limit(&self) -> usize {
        self.max_limit
    }

    async fn fetch_ohlc(&self, request: FetchOhlcRequest) -> Result<Vec<Bar>, AnalysisError> {
        let key = Self::key(&request.symbol, request.timeframe);
        let all = self.bars.lock().unwrap();
        let Some(series) = all.get(&key) else {
            return Ok(vec![]);
        };

        let mut slice: Vec<Bar> = series
            .iter()
            .filter(|b| {
                request.from.map_or(true, |from| b.timestamp >= from)
                    && request.to.map_or(true, |to| b.timestamp <= to)
            })
            .cloned()
            .collect();

        let cap = request.count.min(self.max_limit);
        if slice.len() > cap {
            slice = slice.split_off(slice.len() - cap);
        }
        Ok(slice)
    }

    async fn get_price(&self, symbol: &str) -> Result<f64, AnalysisError> {
        self.price
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| AnalysisError::ApiError(format!("no seeded price for {symbol}")))
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, AnalysisError> {
        Ok(self
            .bars
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.contains(query))
            .cloned()
            .collect())
    }

    async fn list_pairs(&self) -> Result<Vec<String>, AnalysisError> {
        Ok(self.bars.lock().unwrap().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Timeframe;
    use chrono::{Duration, Utc};

    fn bar(ts: chrono::DateTime<Utc>) -> Bar {
        Bar {
            timestamp: ts,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            vwap: None,
        }
    }

    #[tokio::test]
    async fn fetch_ohlc_caps_at_max_limit() {
        let adapter = FixtureAdapter::new(10);
        let tf = Timeframe::parse("1h").unwrap();
        let base = Utc::now();
        let bars: Vec<Bar> = (0..100).map(|i| bar(base + Duration::hours(i))).collect();
        adapter.seed("BTCUSDT", tf, bars);

        let request = FetchOhlcRequest {
            symbol: "BTCUSDT".to_string(),
            timeframe: tf,
            count: 50,
            from: None,
            to: None,
        };
        let got = adapter.fetch_ohlc(request).await.unwrap();
        assert_eq!(got.len(), 10);
    }
}
