//! `RegimeEngine::detect` (§4.5): fans out the seven indicator requests in
//! parallel via `tokio::try_join!` (matching `analysis-orchestrator`'s
//! `tokio::join!` fan-out pattern), then runs Steps A-I in sequence.

use crate::config::RegimeEngineConfig;
use crate::types::{
    Components, RegimeMetadata, RegimeRequest, RegimeResult, VolumeAnalysis,
};
use crate::{classify, confidence, range_bounds, signals, thresholds};
use analysis_core::{
    AnalysisError, Bar, GetSeriesRequest, Indicator, IndicatorConfig, IndicatorEngine, MarketAdapter,
};
use data_provider::{DataProvider, LoadOhlcvRequest};
use std::sync::Arc;

pub struct RegimeEngine<A: MarketAdapter, I: IndicatorEngine> {
    data_provider: Arc<DataProvider<A>>,
    indicators: Arc<I>,
    config: RegimeEngineConfig,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn chronological_ratio(short: &analysis_core::IndicatorSeries, long: &analysis_core::IndicatorSeries) -> Vec<f64> {
    short
        .data
        .iter()
        .zip(long.data.iter())
        .filter_map(|(s, l)| match (s.value, l.value) {
            (Some(sv), Some(lv)) if lv.abs() > f64::EPSILON => Some(sv / lv),
            _ => None,
        })
        .collect()
}

fn adx_history(series: &analysis_core::IndicatorSeries) -> Vec<f64> {
    series
        .data
        .iter()
        .filter_map(|p| p.values.as_ref().and_then(|v| v.get("adx")).copied())
        .collect()
}

/// Built from the fanned-out `Indicator::Volume` series rather than reading
/// `Bar::volume` directly, so the volume analyser stays behind the same
/// `IndicatorEngine` seam as the other six indicator requests.
fn volume_analysis(
    config: &RegimeEngineConfig,
    volume_series: &analysis_core::IndicatorSeries,
) -> Option<VolumeAnalysis> {
    let volumes: Vec<f64> = volume_series.data.iter().filter_map(|p| p.value).collect();
    if volumes.len() <= config.volume_period {
        return None;
    }
    let window = &volumes[volumes.len() - 1 - config.volume_period..volumes.len() - 1];
    let avg = window.iter().sum::<f64>() / window.len() as f64;
    let current = *volumes.last().unwrap();
    let ratio = if avg.abs() > f64::EPSILON { current / avg } else { 0.0 };
    let spike = ratio >= config.volume_spike_threshold;

    let half = window.len() / 2;
    let first_avg = window[..half].iter().sum::<f64>() / half.max(1) as f64;
    let second_avg = window[half..].iter().sum::<f64>() / (window.len() - half).max(1) as f64;

    Some(VolumeAnalysis {
        spike,
        trend_rising: second_avg > first_avg,
        ratio,
    })
}

impl<A: MarketAdapter, I: IndicatorEngine> RegimeEngine<A, I> {
    pub fn new(data_provider: Arc<DataProvider<A>>, indicators: Arc<I>, config: RegimeEngineConfig) -> Self {
        RegimeEngine {
            data_provider,
            indicators,
            config,
        }
    }

    pub async fn detect(&self, request: RegimeRequest) -> Result<RegimeResult, AnalysisError> {
        tracing::debug!(
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            count = request.count,
            "starting regime detection"
        );

        let min_count = request.count.max(self.config.min_bars);
        let fetch_count = min_count + 50;

        let load_request = {
            let mut r = LoadOhlcvRequest::new(request.symbol.clone(), request.timeframe, fetch_count);
            r.reference_date = request.reference_date;
            r.use_cache = request.use_cache;
            r.detect_gaps = request.detect_gaps;
            r
        };

        let loaded = self.data_provider.load_ohlcv(load_request).await?;
        let bars = loaded.bars;

        if bars.len() < self.config.min_bars {
            tracing::warn!(
                symbol = %request.symbol,
                timeframe = %request.timeframe,
                available = bars.len(),
                required = self.config.min_bars,
                "regime detection failed: insufficient bars"
            );
            return Err(AnalysisError::InsufficientData(format!(
                "{} {}: only {} bars available, need at least {}",
                request.symbol,
                request.timeframe,
                bars.len(),
                self.config.min_bars
            )));
        }

        let make_request = |indicator: Indicator, period: usize| GetSeriesRequest {
            symbol: request.symbol.clone(),
            indicator,
            timeframe: request.timeframe,
            bars: bars.clone(),
            reference_date: request.reference_date,
            config: IndicatorConfig::with_period(period),
        };

        let (adx_series, atr_short_series, atr_long_series, ema_short_series, ema_long_series, er_series, volume_series) =
            tokio::try_join!(
                self.indicators.get_series(make_request(Indicator::Adx, self.config.adx_period)),
                self.indicators
                    .get_series(make_request(Indicator::Atr, self.config.atr_short_period)),
                self.indicators
                    .get_series(make_request(Indicator::Atr, self.config.atr_long_period)),
                self.indicators
                    .get_series(make_request(Indicator::Ema, self.config.ma_short_period)),
                self.indicators
                    .get_series(make_request(Indicator::Ema, self.config.ma_long_period)),
                self.indicators
                    .get_series(make_request(Indicator::EfficiencyRatio, self.config.er_period)),
                self.indicators
                    .get_series(make_request(Indicator::Volume, self.config.volume_period)),
            )?;

        let current_values = adx_series.last_values();
        let (adx_current, plus_di_current, minus_di_current) = match current_values {
            Some(v) => (v.get("adx").copied(), v.get("plusDI").copied(), v.get("minusDI").copied()),
            None => (None, None, None),
        };
        let atr_short_current = atr_short_series.last_value();
        let atr_long_current = atr_long_series.last_value();
        let ema_short_current = ema_short_series.last_value();
        let ema_long_current = ema_long_series.last_value();

        let er_raw_history: Vec<f64> = er_series.data.iter().filter_map(|p| p.value).collect();
        let er_smoothed = smoothing_ema(&er_raw_history, self.config.er_smooth_period);
        let er_current = er_smoothed.last().copied();

        let (adx, plus_di, minus_di, atr_short, atr_long, ema_short, ema_long, er) = match (
            adx_current,
            plus_di_current,
            minus_di_current,
            atr_short_current,
            atr_long_current,
            ema_short_current,
            ema_long_current,
            er_current,
        ) {
            (Some(adx), Some(pdi), Some(mdi), Some(ats), Some(atl), Some(es), Some(el), Some(er)) => {
                (adx, pdi, mdi, ats, atl, es, el, er)
            }
            _ => {
                tracing::warn!(
                    symbol = %request.symbol,
                    timeframe = %request.timeframe,
                    "regime detection failed: a required indicator is null at the current bar"
                );
                return Err(AnalysisError::InsufficientData(format!(
                    "{} {}: a required indicator is null at the current bar",
                    request.symbol, request.timeframe
                )));
            }
        };

        let atr_ratio_series = chronological_ratio(&atr_short_series, &atr_long_series);
        let current_atr_ratio = atr_short / atr_long;

        let computed_thresholds = thresholds::compute(
            &self.config,
            request.timeframe,
            &atr_ratio_series,
            current_atr_ratio,
        );

        let trend_phase = signals::adx_slope_phase(&self.config, &adx_history(&adx_series));
        let compression = signals::prior_compression(&self.config, &atr_ratio_series);

        let price = bars.last().unwrap().close;
        let (direction, direction_components) =
            signals::direction(price, ema_short, ema_long, plus_di, minus_di, atr_long);

        let components = Components {
            adx: round_to(adx, 2),
            plus_di: round_to(plus_di, 2),
            minus_di: round_to(minus_di, 2),
            efficiency_ratio: round_to(er, 4),
            atr_ratio: round_to(current_atr_ratio, 4),
            direction: crate::types::DirectionComponents {
                strength: direction_components.strength,
                ema_short: round_to(direction_components.ema_short, 2),
                ema_long: round_to(direction_components.ema_long, 2),
            },
        };

        let regime = classify::classify(&components, &computed_thresholds, direction);

        let volume = volume_analysis(&self.config, &volume_series);

        let breakout_quality = if regime.is_breakout() {
            Some(classify::breakout_quality(
                &components,
                direction,
                &trend_phase,
                volume.as_ref(),
                compression.as_ref(),
            ))
        } else {
            None
        };

        let range_bounds = if regime.is_range() {
            Some(range_bounds::compute(&bars, price, atr_short))
        } else {
            None
        };

        let (confidence_value, scoring_details) = confidence::compute(
            regime,
            direction,
            &components,
            &computed_thresholds,
            &trend_phase,
            volume.as_ref(),
        );

        Ok(RegimeResult {
            regime,
            direction,
            confidence: confidence_value,
            components,
            thresholds: computed_thresholds,
            trend_phase,
            volume_analysis: volume,
            compression,
            breakout_quality,
            range_bounds,
            scoring_details,
            metadata: RegimeMetadata {
                symbol: request.symbol,
                timeframe: request.timeframe.to_string(),
                bars_analyzed: bars.len(),
                reference_date: request.reference_date,
            },
        })
    }
}

fn smoothing_ema(data: &[f64], period: usize) -> Vec<f64> {
    crate::smoothing::ema(data, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Timeframe;
    use cache_manager::{CacheConfig, CacheManager};
    use chrono::{Duration, Utc};
    use data_provider::DataProviderConfig;
    use market_adapter::FixtureAdapter;
    use technical_analysis::LocalIndicatorEngine;

    fn trending_bars(n: usize) -> Vec<Bar> {
        let start = Utc::now() - Duration::hours(n as i64);
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.8;
                Bar {
                    timestamp: start + Duration::hours(i as i64),
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

    async fn engine_with_bars(
        symbol: &str,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> RegimeEngine<FixtureAdapter, LocalIndicatorEngine> {
        let adapter = Arc::new(FixtureAdapter::new(5_000));
        adapter.seed(symbol, timeframe, bars);
        let cache = CacheManager::connect(CacheConfig {
            enabled: false,
            ..Default::default()
        })
        .await
        .unwrap();
        let provider = Arc::new(DataProvider::new(adapter, cache, DataProviderConfig::default()));
        RegimeEngine::new(provider, Arc::new(LocalIndicatorEngine), RegimeEngineConfig::default())
    }

    #[tokio::test]
    async fn detects_a_trending_regime_on_a_steady_uptrend() {
        let tf = Timeframe::parse("1h").unwrap();
        let engine = engine_with_bars("BTCUSDT", tf, trending_bars(150)).await;
        let request = RegimeRequest::new("BTCUSDT", tf, 100);
        let result = engine.detect(request).await.unwrap();
        assert!(result.regime.is_trending() || result.regime.is_breakout());
        assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
    }

    #[tokio::test]
    async fn fails_with_too_few_bars() {
        let tf = Timeframe::parse("1h").unwrap();
        let engine = engine_with_bars("THIN", tf, trending_bars(20)).await;
        let request = RegimeRequest::new("THIN", tf, 100);
        let err = engine.detect(request).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientHistory { .. } | AnalysisError::InsufficientData(_)));
    }

    #[tokio::test]
    async fn detection_is_deterministic_for_identical_input() {
        let tf = Timeframe::parse("1h").unwrap();
        let bars = trending_bars(150);
        let engine_a = engine_with_bars("BTCUSDT", tf, bars.clone()).await;
        let engine_b = engine_with_bars("BTCUSDT", tf, bars).await;
        let result_a = engine_a.detect(RegimeRequest::new("BTCUSDT", tf, 100)).await.unwrap();
        let result_b = engine_b.detect(RegimeRequest::new("BTCUSDT", tf, 100)).await.unwrap();
        assert_eq!(result_a.regime, result_b.regime);
        assert_eq!(result_a.confidence, result_b.confidence);
    }
}
