//! Steps H, I — per-regime coherence rule sets and weighted confidence.

use crate::types::{Components, Direction, Phase, Regime, ScoringDetails, Thresholds, TrendPhase, VolumeAnalysis};

/// Step I. Returns the fraction of regime-specific rules that hold.
fn coherence(
    regime: Regime,
    direction: Direction,
    components: &Components,
    thresholds: &Thresholds,
    volume: Option<&VolumeAnalysis>,
) -> f64 {
    let volume_confirms = volume.map(|v| v.spike && v.trend_rising).unwrap_or(false);
    let no_volume_data = volume.is_none();

    let rules: Vec<bool> = match regime {
        Regime::TrendingBullish => vec![
            components.adx >= thresholds.adx_trending,
            components.efficiency_ratio >= thresholds.er_trending,
            direction == Direction::Bullish,
        ],
        Regime::TrendingBearish => vec![
            components.adx >= thresholds.adx_trending,
            components.efficiency_ratio >= thresholds.er_trending,
            direction == Direction::Bearish,
        ],
        Regime::TrendingNeutral => vec![
            components.adx >= thresholds.adx_trending,
            components.efficiency_ratio >= thresholds.er_trending,
            direction == Direction::Neutral,
        ],
        Regime::RangeLowVol => vec![
            components.atr_ratio <= thresholds.atr_ratio_low,
            components.efficiency_ratio <= thresholds.er_choppy,
        ],
        Regime::RangeHighVol => vec![
            components.atr_ratio >= thresholds.atr_ratio_high,
            components.adx < thresholds.adx_trending,
            components.efficiency_ratio <= thresholds.er_choppy,
        ],
        Regime::RangeDirectional => vec![
            components.adx >= thresholds.adx_trending,
            components.efficiency_ratio <= thresholds.er_choppy,
            components.atr_ratio < thresholds.atr_ratio_high,
        ],
        Regime::RangeNormal => vec![
            components.atr_ratio > thresholds.atr_ratio_low && components.atr_ratio < thresholds.atr_ratio_high,
            components.adx < thresholds.adx_trending,
            components.efficiency_ratio <= thresholds.er_choppy,
        ],
        Regime::BreakoutBullish => vec![
            components.atr_ratio >= thresholds.atr_ratio_high,
            components.adx >= thresholds.adx_trending,
            direction == Direction::Bullish,
            volume_confirms || no_volume_data,
        ],
        Regime::BreakoutBearish => vec![
            components.atr_ratio >= thresholds.atr_ratio_high,
            components.adx >= thresholds.adx_trending,
            direction == Direction::Bearish,
            volume_confirms || no_volume_data,
        ],
        Regime::BreakoutNeutral => vec![
            components.atr_ratio >= thresholds.atr_ratio_high,
            components.adx >= thresholds.adx_trending,
            direction == Direction::Neutral,
        ],
    };

    let true_count = rules.iter().filter(|&&r| r).count();
    true_count as f64 / rules.len() as f64
}

fn regime_clarity(regime: Regime, components: &Components, thresholds: &Thresholds) -> f64 {
    if regime == Regime::RangeDirectional && components.adx >= thresholds.adx_trending {
        return 0.7;
    }

    if regime.is_trending() || regime.is_breakout() {
        let span = (thresholds.adx_strong - thresholds.adx_weak).max(f64::EPSILON);
        ((components.adx - thresholds.adx_weak) / span).clamp(0.0, 1.0)
    } else {
        let span = (thresholds.adx_strong - thresholds.adx_weak).max(f64::EPSILON);
        (1.0 - (components.adx - thresholds.adx_weak) / span).clamp(0.0, 1.0)
    }
}

fn er_score(regime: Regime, er: f64, thresholds: &Thresholds) -> f64 {
    if regime.is_trending() {
        let ceiling = (thresholds.er_trending + 0.2).max(0.7);
        let span = (ceiling - thresholds.er_trending).max(f64::EPSILON);
        ((er - thresholds.er_trending) / span).clamp(0.0, 1.0)
    } else if regime.is_breakout() {
        0.7
    } else {
        let span = thresholds.er_choppy.max(f64::EPSILON);
        (1.0 - (er / span)).clamp(0.0, 1.0)
    }
}

fn direction_score(direction_strength: f64) -> f64 {
    let magnitude = direction_strength.abs();
    if magnitude >= 1.5 {
        1.0
    } else if magnitude >= 1.0 {
        0.75
    } else if magnitude >= 0.5 {
        0.5
    } else {
        0.25
    }
}

fn phase_bonus(regime: Regime, phase: Phase) -> f64 {
    if !regime.is_trending() {
        return 0.0;
    }
    match phase {
        Phase::Nascent => 0.1,
        Phase::Exhausted => -0.1,
        _ => 0.0,
    }
}

/// Step H. Returns `(confidence, scoring_details)`.
pub fn compute(
    regime: Regime,
    direction: Direction,
    components: &Components,
    thresholds: &Thresholds,
    trend_phase: &TrendPhase,
    volume: Option<&VolumeAnalysis>,
) -> (f64, ScoringDetails) {
    let clarity = regime_clarity(regime, components, thresholds);
    let er = er_score(regime, components.efficiency_ratio, thresholds);
    let dir_score = direction_score(components.direction.strength);
    let coh = coherence(regime, direction, components, thresholds, volume);
    let bonus = phase_bonus(regime, trend_phase.phase);

    let raw = 0.35 * clarity + 0.25 * coh + 0.2 * dir_score + 0.2 * er + bonus;
    let confidence = (raw.clamp(0.0, 1.0) * 100.0).round() / 100.0;

    (
        confidence,
        ScoringDetails {
            regime_clarity: clarity,
            er_score: er,
            direction_score: dir_score,
            coherence: coh,
            phase_bonus: bonus,
        },
    )
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

    #[test]
    fn confidence_stays_within_unit_bounds() {
        let components = Components {
            adx: 34.0,
            plus_di: 32.0,
            minus_di: 12.0,
            efficiency_ratio: 0.72,
            atr_ratio: 1.05,
            direction: DirectionComponents {
                strength: 1.8,
                ema_short: 105.0,
                ema_long: 100.0,
            },
        };
        let trend_phase = TrendPhase {
            adx_slope: 0.0,
            phase: Phase::Mature,
        };
        let (confidence, _) = compute(
            Regime::TrendingBullish,
            Direction::Bullish,
            &components,
            &thresholds(),
            &trend_phase,
            None,
        );
        assert!(confidence >= 0.0 && confidence <= 1.0);
        assert!(confidence >= 0.8);
    }

    #[test]
    fn weak_clarity_and_exhausted_phase_yield_low_confidence() {
        let components = Components {
            adx: 20.0,
            plus_di: 20.0,
            minus_di: 20.0,
            efficiency_ratio: 0.5,
            atr_ratio: 1.3,
            direction: DirectionComponents {
                strength: 0.0,
                ema_short: 100.0,
                ema_long: 100.0,
            },
        };
        let trend_phase = TrendPhase {
            adx_slope: -0.1,
            phase: Phase::Exhausted,
        };
        let (confidence, details) = compute(
            Regime::TrendingNeutral,
            Direction::Bullish,
            &components,
            &thresholds(),
            &trend_phase,
            None,
        );
        assert_eq!(details.coherence, 0.0);
        assert!(confidence >= 0.0);
    }
}
