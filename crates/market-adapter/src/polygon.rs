//! `PolygonAdapter`: the production `MarketAdapter`, grounded on
//! `polygon-client::PolygonClient` — same rate limiter, same 429-retry
//! `send_request` wrapper, same aggregates endpoint — generalized from a
//! single hardcoded `(multiplier, timespan)` pair to any parsed `Timeframe`.

use crate::rate_limiter::RateLimiter;
use analysis_core::{AnalysisError, Bar, FetchOhlcRequest, TimeUnit, Timeframe};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://api.polygon.io";

/// Polygon's aggregates endpoint accepts at most this many bars per request
/// (Starter-plan ceiling); batched backfills must chunk around it.
const MAX_LIMIT: usize = 5_000;

#[derive(Clone)]
pub struct PolygonAdapter {
    api_key: String,
    client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl PolygonAdapter {
    pub fn new(api_key: String) -> Self {
        let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AnalysisError> {
        let request = builder
            .build()
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(attempt = attempt + 1, "polygon 429, backing off {wait_secs}s");
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AnalysisError::ApiError(
            "rate limited by polygon after 3 retries".to_string(),
        ))
    }

    fn timespan(unit: TimeUnit) -> &'static str {
        match unit {
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
        }
    }
}

#[async_trait::async_trait]
impl analysis_core::MarketAdapter for PolygonAdapter {
    fn max_limit(&self) -> usize {
        MAX_LIMIT
    }

    async fn fetch_ohlc(&self, request: FetchOhlcRequest) -> Result<Vec<Bar>, AnalysisError> {
        let to = request.to.unwrap_or_else(Utc::now);
        let from = request
            .from
            .unwrap_or_else(|| to - chrono::Duration::milliseconds(request.timeframe.to_millis() * request.count.max(1) as i64));

        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            BASE_URL,
            request.symbol,
            request.timeframe.amount(),
            Self::timespan(request.timeframe.unit()),
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
        );

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", &MAX_LIMIT.to_string()),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(AnalysisError::AdapterFailure {
                symbol: request.symbol.clone(),
                timeframe: request.timeframe.to_string(),
                source: format!("HTTP {}", response.status()),
            });
        }

        let body: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .map(|r| Bar {
                timestamp: DateTime::from_timestamp_millis(r.t).unwrap_or_else(Utc::now),
                open: r.o,
                high: r.h,
                low: r.l,
                close: r.c,
                volume: r.v,
                vwap: r.vw,
            })
            .collect())
    }

    async fn get_price(&self, symbol: &str) -> Result<f64, AnalysisError> {
        let url = format!(
            "{}/v2/snapshot/locale/us/markets/stocks/tickers/{}",
            BASE_URL, symbol
        );
        let response = self
            .send_request(self.client.get(&url).query(&[("apiKey", &self.api_key)]))
            .await?;

        if !response.status().is_success() {
            return Err(AnalysisError::AdapterFailure {
                symbol: symbol.to_string(),
                timeframe: "price".to_string(),
                source: format!("HTTP {}", response.status()),
            });
        }

        let body: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        body.ticker
            .last_trade
            .and_then(|t| t.p)
            .or(body.ticker.day.and_then(|d| d.c))
            .ok_or_else(|| AnalysisError::ApiError(format!("no price available for {symbol}")))
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, AnalysisError> {
        let url = format!("{}/v3/reference/tickers", BASE_URL);
        let response = self
            .send_request(self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("search", query),
                ("active", "true"),
                ("limit", "50"),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "ticker search HTTP {}",
                response.status()
            )));
        }

        let body: TickerListResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(body.results.into_iter().map(|t| t.ticker).collect())
    }

    async fn list_pairs(&self) -> Result<Vec<String>, AnalysisError> {
        self.search("").await
    }
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    #[serde(default)]
    vw: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TickerListResponse {
    #[serde(default)]
    results: Vec<TickerListEntry>,
}

#[derive(Debug, Deserialize)]
struct TickerListEntry {
    ticker: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    ticker: SnapshotTicker,
}

#[derive(Debug, Deserialize)]
struct SnapshotTicker {
    day: Option<SnapshotDay>,
    #[serde(rename = "lastTrade")]
    last_trade: Option<SnapshotLastTrade>,
}

#[derive(Debug, Deserialize)]
struct SnapshotDay {
    c: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SnapshotLastTrade {
    p: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timespan_maps_every_unit() {
        assert_eq!(PolygonAdapter::timespan(TimeUnit::Minute), "minute");
        assert_eq!(PolygonAdapter::timespan(TimeUnit::Month), "month");
    }

    #[test]
    fn max_limit_matches_the_starter_plan_ceiling() {
        let adapter = PolygonAdapter::new("test-key".to_string());
        use analysis_core::MarketAdapter;
        assert_eq!(adapter.max_limit(), 5_000);
    }
}
