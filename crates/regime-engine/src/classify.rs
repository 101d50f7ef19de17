//! Steps E, F — regime classification and breakout quality scoring.

use crate::types::{
    BreakoutGrade, BreakoutQuality, Components, Direction, Phase, Regime, Thresholds,
    TrendPhase, VolumeAnalysis,
};

/// Step E.
pub fn classify(components: &Components, thresholds: &Thresholds, direction: Direction) -> Regime {
    let expansion = components.atr_ratio > thresholds.atr_ratio_high;
    let trend_strong = components.adx >= thresholds.adx_trending;

    if expansion && trend_strong {
        return match direction {
            Direction::Bullish => Regime::BreakoutBullish,
            Direction::Bearish => Regime::BreakoutBearish,
            Direction::Neutral => Regime::BreakoutNeutral,
        };
    }

    if components.adx >= thresholds.adx_trending && components.efficiency_ratio >= thresholds.er_trending {
        return match direction {
            Direction::Bullish => Regime::TrendingBullish,
            Direction::Bearish => Regime::TrendingBearish,
            Direction::Neutral => Regime::TrendingNeutral,
        };
    }

    if components.adx >= thresholds.adx_trending {
        Regime::RangeDirectional
    } else if components.atr_ratio < thresholds.atr_ratio_low {
        Regime::RangeLowVol
    } else if components.atr_ratio > thresholds.atr_ratio_high {
        Regime::RangeHighVol
    } else {
        Regime::RangeNormal
    }
}

/// Step F. Only meaningful when `regime.is_breakout()`.
pub fn breakout_quality(
    components: &Components,
    direction: Direction,
    trend_phase: &TrendPhase,
    volume: Option<&VolumeAnalysis>,
    compression: Option<&crate::types::Compression>,
) -> BreakoutQuality {
    let mut score = 0i32;
    let mut factors = vec![];

    match volume {
        Some(v) if v.spike && v.trend_rising => {
            score += 30;
            factors.push("volume_confirmed");
        }
        Some(v) if v.spike => {
            score += 15;
            factors.push("volume_spike");
        }
        _ => {}
    }

    if compression.map(|c| c.detected).unwrap_or(false) {
        score += 30;
        factors.push("prior_compression");
    }

    match trend_phase.phase {
        Phase::Nascent => {
            score += 25;
            factors.push("trend_nascent");
        }
        Phase::Mature => {
            score += 10;
            factors.push("trend_mature");
        }
        Phase::Exhausted => {
            score -= 15;
            factors.push("trend_exhausted");
        }
        Phase::Unknown => {}
    }

    if !matches!(direction, Direction::Neutral) && components.direction.strength.abs() > 0.5 {
        score += 15;
        factors.push("clear_direction");
    }

    let grade = if score >= 70 {
        BreakoutGrade::High
    } else if score >= 40 {
        BreakoutGrade::Medium
    } else {
        BreakoutGrade::Low
    };

    BreakoutQuality {
        score,
        grade,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DirectionComponents;

    fn thresholds() -> Thresholds {
        Thresholds {
            adx_weak: 20.0,
            adx_trending: 25.0,
            adx_strong: 35.0,
            er_choppy: 0.3,
            er_trending: 0.5,
            atr_ratio_low: 0.7,
            atr_ratio_high: 1.3,
        }
    }

    fn components(adx: f64, er: f64, atr_ratio: f64, strength: f64) -> Components {
        Components {
            adx,
            plus_di: 30.0,
            minus_di: 12.0,
            efficiency_ratio: er,
            atr_ratio,
            direction: DirectionComponents {
                strength,
                ema_short: 105.0,
                ema_long: 100.0,
            },
        }
    }

    #[test]
    fn breakout_beats_trending_when_expansion_and_strong() {
        let c = components(34.0, 0.72, 1.6, 1.0);
        let regime = classify(&c, &thresholds(), Direction::Bullish);
        assert_eq!(regime, Regime::BreakoutBullish);
    }

    #[test]
    fn trending_when_no_expansion() {
        let c = components(34.0, 0.72, 1.05, 1.0);
        let regime = classify(&c, &thresholds(), Direction::Bullish);
        assert_eq!(regime, Regime::TrendingBullish);
    }

    #[test]
    fn range_normal_when_nothing_stands_out() {
        let c = components(15.0, 0.18, 0.9, 0.0);
        let regime = classify(&c, &thresholds(), Direction::Neutral);
        assert_eq!(regime, Regime::RangeNormal);
    }

    #[test]
    fn high_grade_breakout_with_confirming_factors() {
        let c = components(34.0, 0.72, 1.6, 1.0);
        let trend_phase = TrendPhase {
            adx_slope: 0.05,
            phase: Phase::Nascent,
        };
        let volume = VolumeAnalysis {
            spike: true,
            trend_rising: true,
            ratio: 2.1,
        };
        let compression = crate::types::Compression {
            detected: true,
            ratio: 0.6,
            minimum: 0.5,
        };
        let quality = breakout_quality(
            &c,
            Direction::Bearish,
            &trend_phase,
            Some(&volume),
            Some(&compression),
        );
        assert_eq!(quality.grade, BreakoutGrade::High);
        assert!(quality.factors.contains(&"volume_confirmed"));
        assert!(quality.factors.contains(&"prior_compression"));
    }
}
