//! Wraps the pure indicator functions in `indicators.rs` behind the
//! `analysis_core::IndicatorEngine` capability trait, so `RegimeEngine` and
//! `StatisticalContext` only ever depend on the `getSeries` contract.

use crate::indicators;
use analysis_core::{
    AnalysisError, Bar, GetSeriesRequest, Indicator, IndicatorEngine as IndicatorEngineTrait,
    IndicatorPoint, IndicatorSeries,
};
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalIndicatorEngine;

/// Right-aligns a shorter-than-input values vector against `bars`, padding
/// the warmup prefix with explicit `None`s rather than omitting it.
fn align_scalar(bars: &[Bar], values: &[f64]) -> IndicatorSeries {
    let offset = bars.len().saturating_sub(values.len());
    let data = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            timestamp: bar.timestamp,
            value: if i >= offset {
                Some(values[i - offset])
            } else {
                None
            },
            values: None,
        })
        .collect();
    IndicatorSeries { data }
}

fn aligned_value_at(bars_len: usize, values: &[f64], index: usize) -> Option<f64> {
    let offset = bars_len.saturating_sub(values.len());
    if index < offset {
        None
    } else {
        values.get(index - offset).copied()
    }
}

#[async_trait]
impl IndicatorEngineTrait for LocalIndicatorEngine {
    async fn get_series(
        &self,
        request: GetSeriesRequest,
    ) -> Result<IndicatorSeries, AnalysisError> {
        let bars = &request.bars;
        if bars.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "{}: no bars supplied for {:?}",
                request.symbol, request.indicator
            )));
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let cfg = &request.config;

        let series = match request.indicator {
            Indicator::Ema => {
                let period = cfg.period.unwrap_or(20);
                align_scalar(bars, &indicators::ema(&closes, period))
            }
            Indicator::Sma => {
                let period = cfg.period.unwrap_or(20);
                align_scalar(bars, &indicators::sma(&closes, period))
            }
            Indicator::Rsi => {
                let period = cfg.period.unwrap_or(14);
                align_scalar(bars, &indicators::rsi(&closes, period))
            }
            Indicator::Atr => {
                let period = cfg.period.unwrap_or(14);
                align_scalar(bars, &indicators::atr(bars, period))
            }
            Indicator::EfficiencyRatio => {
                let period = cfg.period.unwrap_or(10);
                align_scalar(bars, &indicators::efficiency_ratio(&closes, period))
            }
            Indicator::Psar => align_scalar(bars, &indicators::psar(bars, 0.02, 0.02, 0.2)),
            Indicator::Obv => align_scalar(bars, &indicators::obv(bars)),
            Indicator::Vwap => align_scalar(bars, &indicators::vwap(bars)),
            Indicator::Volume => {
                let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
                align_scalar(bars, &volumes)
            }
            Indicator::Adx => {
                let period = cfg.period.unwrap_or(14);
                let result = indicators::adx(bars, period);
                let data = (0..bars.len())
                    .map(|i| {
                        let adx = aligned_value_at(bars.len(), &result.adx, i);
                        let plus_di = aligned_value_at(bars.len(), &result.plus_di, i);
                        let minus_di = aligned_value_at(bars.len(), &result.minus_di, i);
                        let values = match (adx, plus_di, minus_di) {
                            (Some(a), Some(p), Some(m)) => {
                                let mut map = HashMap::new();
                                map.insert("adx".to_string(), a);
                                map.insert("plusDI".to_string(), p);
                                map.insert("minusDI".to_string(), m);
                                Some(map)
                            }
                            _ => None,
                        };
                        IndicatorPoint {
                            timestamp: bars[i].timestamp,
                            value: None,
                            values,
                        }
                    })
                    .collect();
                IndicatorSeries { data }
            }
            Indicator::Bb | Indicator::BbWidth => {
                let period = cfg.period.unwrap_or(20);
                let std_dev = cfg.std_dev.unwrap_or(2.0);
                let bb = indicators::bollinger_bands(&closes, period, std_dev);
                let data = (0..bars.len())
                    .map(|i| {
                        let upper = aligned_value_at(bars.len(), &bb.upper, i);
                        let middle = aligned_value_at(bars.len(), &bb.middle, i);
                        let lower = aligned_value_at(bars.len(), &bb.lower, i);
                        match (upper, middle, lower) {
                            (Some(u), Some(m), Some(l)) => {
                                let mut map = HashMap::new();
                                if request.indicator == Indicator::BbWidth {
                                    let width = if m.abs() > f64::EPSILON {
                                        (u - l) / m
                                    } else {
                                        0.0
                                    };
                                    IndicatorPoint {
                                        timestamp: bars[i].timestamp,
                                        value: Some(width),
                                        values: None,
                                    }
                                } else {
                                    map.insert("bbUpper".to_string(), u);
                                    map.insert("bbMiddle".to_string(), m);
                                    map.insert("bbLower".to_string(), l);
                                    IndicatorPoint {
                                        timestamp: bars[i].timestamp,
                                        value: None,
                                        values: Some(map),
                                    }
                                }
                            }
                            _ => IndicatorPoint {
                                timestamp: bars[i].timestamp,
                                value: None,
                                values: None,
                            },
                        }
                    })
                    .collect();
                IndicatorSeries { data }
            }
            Indicator::Macd => {
                let fast = cfg.fast_period.unwrap_or(12);
                let slow = cfg.slow_period.unwrap_or(26);
                let signal = cfg.signal_period.unwrap_or(9);
                let result = indicators::macd(&closes, fast, slow, signal);
                let data = (0..bars.len())
                    .map(|i| {
                        let macd = aligned_value_at(bars.len(), &result.macd_line, i);
                        let signal_v = aligned_value_at(bars.len(), &result.signal_line, i);
                        let hist = aligned_value_at(bars.len(), &result.histogram, i);
                        match (macd, signal_v, hist) {
                            (Some(m), Some(s), Some(h)) => {
                                let mut map = HashMap::new();
                                map.insert("macd".to_string(), m);
                                map.insert("signal".to_string(), s);
                                map.insert("histogram".to_string(), h);
                                IndicatorPoint {
                                    timestamp: bars[i].timestamp,
                                    value: None,
                                    values: Some(map),
                                }
                            }
                            _ => IndicatorPoint {
                                timestamp: bars[i].timestamp,
                                value: None,
                                values: None,
                            },
                        }
                    })
                    .collect();
                IndicatorSeries { data }
            }
        };

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{IndicatorConfig, Timeframe};
    use chrono::{Duration, Utc};

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc::now();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Bar {
                    timestamp: start + Duration::hours(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0,
                    vwap: None,
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn ema_series_matches_bar_count() {
        let engine = LocalIndicatorEngine;
        let b = bars(60);
        let series = engine
            .get_series(GetSeriesRequest {
                symbol: "BTCUSDT".into(),
                indicator: Indicator::Ema,
                timeframe: Timeframe::parse("1h").unwrap(),
                bars: b.clone(),
                reference_date: None,
                config: IndicatorConfig::with_period(20),
            })
            .await
            .unwrap();
        assert_eq!(series.data.len(), b.len());
        assert!(series.last_value().is_some());
    }

    #[tokio::test]
    async fn adx_exposes_composite_fields() {
        let engine = LocalIndicatorEngine;
        let b = bars(60);
        let series = engine
            .get_series(GetSeriesRequest {
                symbol: "BTCUSDT".into(),
                indicator: Indicator::Adx,
                timeframe: Timeframe::parse("1h").unwrap(),
                bars: b,
                reference_date: None,
                config: IndicatorConfig::with_period(14),
            })
            .await
            .unwrap();
        let last = series.last_values().expect("adx should have a current value");
        assert!(last.contains_key("adx"));
        assert!(last.contains_key("plusDI"));
        assert!(last.contains_key("minusDI"));
    }

    #[tokio::test]
    async fn empty_bars_is_an_error() {
        let engine = LocalIndicatorEngine;
        let result = engine
            .get_series(GetSeriesRequest {
                symbol: "BTCUSDT".into(),
                indicator: Indicator::Ema,
                timeframe: Timeframe::parse("1h").unwrap(),
                bars: vec![],
                reference_date: None,
                config: IndicatorConfig::default(),
            })
            .await;
        assert!(result.is_err());
    }
}
