//! Step A — adaptive thresholds. Rescales fixed base bands for ADX, ER and
//! the ATR-ratio by a timeframe multiplier and a volatility multiplier
//! derived from `analysis_core::adaptive::percentile_value` used as a
//! median proxy, per `analysis-core::adaptive`'s percentile/z-score idiom.

use crate::config::RegimeEngineConfig;
use crate::types::Thresholds;
use analysis_core::{adaptive, Timeframe};

const ADX_WEAK_BASE: f64 = 20.0;
const ADX_TRENDING_BASE: f64 = 25.0;
const ADX_STRONG_BASE: f64 = 35.0;
const ER_CHOPPY_BASE: f64 = 0.3;
const ER_TRENDING_BASE: f64 = 0.5;
const ATR_RATIO_LOW_BASE: f64 = 0.7;
const ATR_RATIO_HIGH_BASE: f64 = 1.3;

/// Fixed per-timeframe adaptive multiplier table (§6).
fn timeframe_multiplier(timeframe: Timeframe) -> f64 {
    match timeframe.to_string().as_str() {
        "1m" => 1.30,
        "5m" => 1.20,
        "15m" => 1.10,
        "30m" => 1.05,
        "1h" => 1.00,
        "2h" => 0.95,
        "4h" => 0.90,
        "1d" => 0.85,
        "1w" => 0.80,
        _ => 1.00,
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// `atr_ratio_series` is the chronological `atrShort/atrLong` history
/// (oldest first); `current_ratio` is its last value.
pub fn compute(
    config: &RegimeEngineConfig,
    timeframe: Timeframe,
    atr_ratio_series: &[f64],
    current_ratio: f64,
) -> Thresholds {
    let tf_mult = timeframe_multiplier(timeframe);

    let volatility_mult = if config.adaptive.enabled && atr_ratio_series.len() >= 20 {
        let window = atr_ratio_series
            .len()
            .min(config.adaptive.volatility_window)
            .max(20);
        let recent = &atr_ratio_series[atr_ratio_series.len() - window..];
        let median = adaptive::percentile_value(recent, 50.0);
        let ratio_of_ratios = if median.abs() > f64::EPSILON {
            current_ratio / median
        } else {
            1.0
        };
        let raw = config.adaptive.volatility_formula.apply(ratio_of_ratios);
        clamp(
            raw,
            config.adaptive.volatility.min_multiplier,
            config.adaptive.volatility.max_multiplier,
        )
    } else {
        1.0
    };

    let adx_combined = tf_mult * volatility_mult.min(1.2);
    let er_factor = 0.8 + 0.2 * tf_mult;
    let atr_inverse = (volatility_mult.max(f64::EPSILON)).sqrt();

    let mut adx_weak = clamp(ADX_WEAK_BASE * adx_combined, 10.0, 35.0);
    let mut adx_trending = clamp(ADX_TRENDING_BASE * adx_combined, 15.0, 35.0);
    let mut adx_strong = clamp(ADX_STRONG_BASE * adx_combined, 25.0, 50.0);
    if adx_weak >= adx_trending {
        adx_trending = adx_weak + 0.5;
    }
    if adx_trending >= adx_strong {
        adx_strong = adx_trending + 0.5;
    }

    let mut er_choppy = clamp(ER_CHOPPY_BASE * er_factor, 0.1, 0.5);
    let mut er_trending = clamp(ER_TRENDING_BASE * er_factor, 0.3, 0.8);
    if er_choppy >= er_trending {
        er_trending = er_choppy + 0.01;
    }

    let mut atr_ratio_low = (ATR_RATIO_LOW_BASE / atr_inverse).max(0.3);
    let mut atr_ratio_high = (ATR_RATIO_HIGH_BASE / atr_inverse).max(1.0);
    if atr_ratio_low >= atr_ratio_high {
        atr_ratio_high = atr_ratio_low + 0.05;
    }

    Thresholds {
        adx_weak,
        adx_trending,
        adx_strong,
        er_choppy,
        er_trending,
        atr_ratio_low,
        atr_ratio_high,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_strictly_monotonic() {
        let config = RegimeEngineConfig::default();
        let tf = Timeframe::parse("1h").unwrap();
        let series: Vec<f64> = (0..40).map(|i| 0.8 + (i as f64) * 0.01).collect();
        let current = *series.last().unwrap();
        let t = compute(&config, tf, &series, current);
        assert!(t.adx_weak < t.adx_trending);
        assert!(t.adx_trending < t.adx_strong);
        assert!(t.er_choppy < t.er_trending);
        assert!(t.atr_ratio_low < t.atr_ratio_high);
    }

    #[test]
    fn falls_back_to_unit_volatility_multiplier_with_little_history() {
        let config = RegimeEngineConfig::default();
        let tf = Timeframe::parse("1d").unwrap();
        let t = compute(&config, tf, &[], 1.0);
        assert!(t.adx_weak > 0.0);
    }
}
