//! Top-level entry point: `StatisticalContext::build` ->
//! `AlignmentAggregator::aggregate` -> `NarrativeProjector::project`, the
//! whole pipeline bounded by `context_timeout_ms` (§5). The timeout wraps the
//! full dataflow rather than each stage individually, matching the
//! single-outer-timeout shape `binance_hardened_ingest` uses around its
//! connect/subscribe calls.

use std::sync::Arc;
use std::time::Duration;

use analysis_core::{AnalysisError, IndicatorEngine, MarketAdapter};

use crate::alignment;
use crate::config::ContextConfig;
use crate::context::StatisticalContext;
use crate::narrative;
use crate::types::{AlignmentReport, FullContext, NarrativeReport, TimeframeSet};

pub struct MarketContextResult {
    pub full_context: FullContext,
    pub alignment: AlignmentReport,
    pub narrative: NarrativeReport,
}

pub async fn analyze<A: MarketAdapter, I: IndicatorEngine>(
    context: &StatisticalContext<A, I>,
    config: &ContextConfig,
    symbol: &str,
    timeframes: TimeframeSet,
) -> Result<MarketContextResult, AnalysisError> {
    let timeout = Duration::from_millis(config.context_timeout_ms);
    match tokio::time::timeout(timeout, context.build(symbol, timeframes)).await {
        Ok(Ok(full_context)) => {
            let report = alignment::aggregate(&full_context);
            let narrative = narrative::project(&full_context, &report);
            Ok(MarketContextResult {
                full_context,
                alignment: report,
                narrative,
            })
        }
        Ok(Err(err)) => Err(err),
        Err(_) => Err(AnalysisError::Timeout {
            symbol: symbol.to_string(),
            elapsed_ms: config.context_timeout_ms,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    use analysis_core::{Bar, Timeframe};
    use cache_manager::{CacheConfig, CacheManager};
    use chrono::{Duration as ChronoDuration, Utc};
    use data_provider::DataProviderConfig;
    use market_adapter::FixtureAdapter;
    use regime_engine::{RegimeEngine, RegimeEngineConfig};
    use technical_analysis::LocalIndicatorEngine;

    fn trending_bars(n: usize) -> Vec<Bar> {
        let start = Utc::now() - ChronoDuration::hours(n as i64);
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.8;
                Bar {
                    timestamp: start + ChronoDuration::hours(i as i64),
                    open: close - 0.3,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0 + i as f64 * 5.0,
                    vwap: None,
                }
            })
            .collect()
    }

    async fn build_context() -> StatisticalContext<FixtureAdapter, LocalIndicatorEngine> {
        let tf = Timeframe::parse("1d").unwrap();
        let adapter = StdArc::new(FixtureAdapter::new(5_000));
        adapter.seed("TEST", tf, trending_bars(400));
        let cache = CacheManager::connect(CacheConfig {
            enabled: false,
            ..Default::default()
        })
        .await
        .unwrap();
        let provider = StdArc::new(DataProvider::new(adapter, cache, DataProviderConfig::default()));
        let indicators = StdArc::new(LocalIndicatorEngine);
        let regime_engine = StdArc::new(RegimeEngine::new(
            provider.clone(),
            indicators.clone(),
            RegimeEngineConfig::default(),
        ));
        StatisticalContext::new(provider, regime_engine, indicators, ContextConfig::default())
    }

    #[tokio::test]
    async fn analyze_produces_a_narrative_for_a_single_timeframe() {
        let context = build_context().await;
        let config = ContextConfig::default();
        let timeframes = TimeframeSet {
            long: Some(Timeframe::parse("1d").unwrap()),
            medium: None,
            short: None,
        };
        let result = analyze(&context, &config, "TEST", timeframes).await.unwrap();
        assert_eq!(result.full_context.timeframes.len(), 1);
        assert!(result.narrative.alignment.is_some());
    }

    #[tokio::test]
    async fn analyze_times_out_quickly_when_given_a_near_zero_budget() {
        let context = build_context().await;
        let mut config = ContextConfig::default();
        config.context_timeout_ms = 0;
        let timeframes = TimeframeSet {
            long: Some(Timeframe::parse("1d").unwrap()),
            medium: None,
            short: None,
        };
        let result = analyze(&context, &config, "TEST", timeframes).await;
        assert!(matches!(result, Err(AnalysisError::Timeout { .. })));
    }
}
