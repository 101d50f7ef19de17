//! Step G — range bounds via swing-point detection and clustering.

use crate::types::{PriceCluster, Proximity, RangeBounds, RangeMethod, RangeStrength};
use analysis_core::Bar;

const LOOKBACK: usize = 3;
const SWING_WINDOW: usize = 100;

/// Matches the rounding `RegimeResult`'s price fields carry end to end
/// (§ output schema: prices to 8 decimals).
fn round8(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}

#[derive(Debug, Clone, Copy)]
struct Swing {
    price: f64,
    index: usize,
}

fn swing_highs(bars: &[Bar], atr_short: f64) -> Vec<Swing> {
    let mut out = vec![];
    let start = bars.len().saturating_sub(SWING_WINDOW);
    for i in (start + LOOKBACK)..bars.len().saturating_sub(LOOKBACK) {
        let high = bars[i].high;
        let left_ok = (i - LOOKBACK..i).all(|j| high >= bars[j].high);
        let right_ok = (i + 1..=i + LOOKBACK).all(|j| high >= bars[j].high);
        if !left_ok || !right_ok {
            continue;
        }
        let window_start = i.saturating_sub(2 * LOOKBACK);
        let window_end = (i + 2 * LOOKBACK).min(bars.len() - 1);
        let min_low = bars[window_start..=window_end]
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min);
        if high - min_low >= 0.3 * atr_short {
            out.push(Swing { price: high, index: i });
        }
    }
    out
}

fn swing_lows(bars: &[Bar], atr_short: f64) -> Vec<Swing> {
    let mut out = vec![];
    let start = bars.len().saturating_sub(SWING_WINDOW);
    for i in (start + LOOKBACK)..bars.len().saturating_sub(LOOKBACK) {
        let low = bars[i].low;
        let left_ok = (i - LOOKBACK..i).all(|j| low <= bars[j].low);
        let right_ok = (i + 1..=i + LOOKBACK).all(|j| low <= bars[j].low);
        if !left_ok || !right_ok {
            continue;
        }
        let window_start = i.saturating_sub(2 * LOOKBACK);
        let window_end = (i + 2 * LOOKBACK).min(bars.len() - 1);
        let max_high = bars[window_start..=window_end]
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        if max_high - low >= 0.3 * atr_short {
            out.push(Swing { price: low, index: i });
        }
    }
    out
}

fn cluster(mut swings: Vec<Swing>, atr_short: f64) -> Vec<PriceCluster> {
    swings.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap());
    let mut clusters: Vec<PriceCluster> = vec![];
    let mut current: Vec<Swing> = vec![];

    let flush = |current: &mut Vec<Swing>, clusters: &mut Vec<PriceCluster>| {
        if current.is_empty() {
            return;
        }
        let avg_price = current.iter().map(|s| s.price).sum::<f64>() / current.len() as f64;
        let first_index = current.iter().map(|s| s.index).min().unwrap();
        let last_index = current.iter().map(|s| s.index).max().unwrap();
        clusters.push(PriceCluster {
            avg_price,
            touches: current.len(),
            first_index,
            last_index,
        });
        current.clear();
    };

    for swing in swings {
        if current.is_empty() {
            current.push(swing);
            continue;
        }
        let mean = current.iter().map(|s| s.price).sum::<f64>() / current.len() as f64;
        if (swing.price - mean).abs() <= 0.5 * atr_short {
            current.push(swing);
        } else {
            flush(&mut current, &mut clusters);
            current.push(swing);
        }
    }
    flush(&mut current, &mut clusters);
    clusters
}

fn select_resistance(clusters: &[PriceCluster], price: f64) -> Option<PriceCluster> {
    let above: Vec<&PriceCluster> = clusters.iter().filter(|c| c.avg_price > price).collect();
    if let Some(c) = above
        .iter()
        .filter(|c| c.touches >= 2)
        .min_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap())
    {
        return Some(**c);
    }
    if let Some(c) = above
        .iter()
        .min_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap())
    {
        return Some(**c);
    }
    clusters
        .iter()
        .max_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap())
        .copied()
}

fn select_support(clusters: &[PriceCluster], price: f64) -> Option<PriceCluster> {
    let below: Vec<&PriceCluster> = clusters.iter().filter(|c| c.avg_price < price).collect();
    if let Some(c) = below
        .iter()
        .filter(|c| c.touches >= 2)
        .max_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap())
    {
        return Some(**c);
    }
    if let Some(c) = below
        .iter()
        .max_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap())
    {
        return Some(**c);
    }
    clusters
        .iter()
        .min_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap())
        .copied()
}

pub fn compute(bars: &[Bar], price: f64, atr_short: f64) -> RangeBounds {
    let price_range = bars
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max)
        - bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let proximity_threshold = (2.0 * price_range).max(10.0 * atr_short);

    let mut highs = swing_highs(bars, atr_short);
    let mut lows = swing_lows(bars, atr_short);
    highs.retain(|s| (s.price - price).abs() <= proximity_threshold);
    lows.retain(|s| (s.price - price).abs() <= proximity_threshold);

    let resistance_clusters = cluster(highs, atr_short);
    let support_clusters = cluster(lows, atr_short);

    let resistance = select_resistance(&resistance_clusters, price);
    let support = select_support(&support_clusters, price);

    let (support_v, resistance_v, method) = match (support, resistance) {
        (Some(s), Some(r)) if s.touches + r.touches >= 1 => {
            (s.avg_price, r.avg_price, RangeMethod::SwingClusters)
        }
        _ => {
            let recent_min = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let recent_max = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            (recent_min, recent_max, RangeMethod::MinmaxFallback)
        }
    };

    let width = (resistance_v - support_v).max(f64::EPSILON);
    let position = ((price - support_v) / width).clamp(0.0, 1.0);
    let width_atr = if atr_short.abs() > f64::EPSILON {
        width / atr_short
    } else {
        0.0
    };

    let near_threshold = 0.5 * atr_short;
    let proximity = if resistance_v - price <= near_threshold {
        Proximity::NearResistance
    } else if price - support_v <= near_threshold {
        Proximity::NearSupport
    } else if position > 0.5 {
        Proximity::UpperHalf
    } else if position < 0.5 {
        Proximity::LowerHalf
    } else {
        Proximity::Middle
    };

    let total_touches = support.map(|s| s.touches).unwrap_or(0) + resistance.map(|r| r.touches).unwrap_or(0);
    let strength = if total_touches >= 6 {
        RangeStrength::Strong
    } else if total_touches >= 4 {
        RangeStrength::Moderate
    } else {
        RangeStrength::Weak
    };

    let additional_resistance: Vec<PriceCluster> = resistance_clusters
        .iter()
        .filter(|c| resistance.map(|r| r.avg_price != c.avg_price).unwrap_or(true))
        .take(3)
        .copied()
        .collect();
    let additional_support: Vec<PriceCluster> = support_clusters
        .iter()
        .filter(|c| support.map(|s| s.avg_price != c.avg_price).unwrap_or(true))
        .take(3)
        .copied()
        .collect();

    RangeBounds {
        support: round8(support_v),
        resistance: round8(resistance_v),
        width: round8(width),
        position,
        width_atr: round8(width_atr),
        proximity,
        strength,
        method,
        additional_support,
        additional_resistance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn oscillating_bars(n: usize) -> Vec<Bar> {
        let start = Utc::now();
        (0..n)
            .map(|i| {
                let phase = (i as f64 * 0.6).sin();
                let close = 100.0 + phase * 3.0;
                Bar {
                    timestamp: start + Duration::hours(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 10.0,
                    vwap: None,
                }
            })
            .collect()
    }

    #[test]
    fn falls_back_to_minmax_with_too_few_swings() {
        let bars: Vec<Bar> = (0..5)
            .map(|i| Bar {
                timestamp: Utc::now() + Duration::hours(i),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1.0,
                vwap: None,
            })
            .collect();
        let bounds = compute(&bars, 100.0, 1.0);
        assert_eq!(bounds.method, RangeMethod::MinmaxFallback);
    }

    #[test]
    fn position_is_clamped_into_unit_interval() {
        let bars = oscillating_bars(80);
        let price = bars.last().unwrap().close;
        let bounds = compute(&bars, price, 1.0);
        assert!(bounds.position >= 0.0 && bounds.position <= 1.0);
        assert!(bounds.support <= bounds.resistance);
    }
}
