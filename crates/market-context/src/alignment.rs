//! `AlignmentAggregator` (§4.7): turns one `FullContext`'s per-timeframe
//! regime calls into a single weighted directional vote, plus conflict
//! detection between timeframes.

use analysis_core::Timeframe;
use regime_engine::Direction;

use crate::types::{
    AlignmentQuality, AlignmentReport, AlignmentSignal, Conflict, ConflictSeverity, FullContext,
    RegimeClass,
};

/// Fixed per-timeframe vote weight (§4.7). Unlisted timeframes default to 1.0,
/// matching the neutral default `regime-engine::thresholds::timeframe_multiplier`
/// already uses for the same situation.
fn weight_for(timeframe: Timeframe) -> f64 {
    match timeframe.to_string().as_str() {
        "1m" => 0.3,
        "5m" => 0.5,
        "15m" => 0.8,
        "30m" => 1.0,
        "1h" => 1.5,
        "4h" => 2.0,
        "1d" => 3.0,
        "1w" => 2.5,
        _ => 1.0,
    }
}

pub fn extract_signals(context: &FullContext) -> Vec<AlignmentSignal> {
    context
        .timeframes
        .iter()
        .map(|tf| AlignmentSignal {
            timeframe: tf.timeframe,
            regime_class: RegimeClass::from(tf.regime.regime),
            direction: tf.regime.direction,
            confidence: tf.regime.confidence,
            weight: weight_for(tf.timeframe),
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn directional_score(signals: &[AlignmentSignal], direction: Direction) -> f64 {
    signals
        .iter()
        .filter(|s| s.direction == direction)
        .map(|s| s.weight * s.confidence)
        .sum()
}

fn detect_conflicts(signals: &[AlignmentSignal]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    // High-timeframe conflict: two signals each weighted >= 2.0 disagree.
    let heavy: Vec<&AlignmentSignal> = signals.iter().filter(|s| s.weight >= 2.0).collect();
    for i in 0..heavy.len() {
        for j in (i + 1)..heavy.len() {
            if heavy[i].direction != heavy[j].direction
                && heavy[i].direction != Direction::Neutral
                && heavy[j].direction != Direction::Neutral
            {
                conflicts.push(Conflict {
                    label: "high_timeframe_conflict",
                    severity: ConflictSeverity::High,
                });
            }
        }
    }

    // Directional conflict: at least one bullish and one bearish signal exist,
    // not already covered by the high-timeframe case above. Severity is
    // `moderate` only when both sides muster >= 2 signals, else `low`.
    if conflicts.is_empty() {
        let bullish_count = signals.iter().filter(|s| s.direction == Direction::Bullish).count();
        let bearish_count = signals.iter().filter(|s| s.direction == Direction::Bearish).count();
        if bullish_count >= 1 && bearish_count >= 1 {
            let severity = if bullish_count >= 2 && bearish_count >= 2 {
                ConflictSeverity::Moderate
            } else {
                ConflictSeverity::Low
            };
            conflicts.push(Conflict {
                label: "directional_conflict",
                severity,
            });
        }
    }

    // HTF/LTF divergence: the dominant direction among weight >= 2.0 signals
    // (by weighted-confidence score, same rule as the overall vote) opposed
    // by any single weight < 2.0 signal.
    let (heavy_signals, light_signals): (Vec<&AlignmentSignal>, Vec<&AlignmentSignal>) =
        signals.iter().partition(|s| s.weight >= 2.0);
    if !heavy_signals.is_empty() {
        let score = |direction: Direction| -> f64 {
            heavy_signals
                .iter()
                .filter(|s| s.direction == direction)
                .map(|s| s.weight * s.confidence)
                .sum()
        };
        let heavy_bullish = score(Direction::Bullish);
        let heavy_bearish = score(Direction::Bearish);
        let dominant_htf = if heavy_bullish > heavy_bearish {
            Some(Direction::Bullish)
        } else if heavy_bearish > heavy_bullish {
            Some(Direction::Bearish)
        } else {
            None
        };
        if let Some(dominant) = dominant_htf {
            let opposed = light_signals.iter().any(|s| {
                s.direction != Direction::Neutral && s.direction != dominant
            });
            if opposed {
                conflicts.push(Conflict {
                    label: "htf_ltf_divergence",
                    severity: ConflictSeverity::Low,
                });
            }
        }
    }

    conflicts
}

fn quality_for(alignment_score: f64, conflicts: &[Conflict]) -> AlignmentQuality {
    let has_moderate_or_worse = conflicts
        .iter()
        .any(|c| matches!(c.severity, ConflictSeverity::Moderate | ConflictSeverity::High));
    let has_high = conflicts.iter().any(|c| c.severity == ConflictSeverity::High);

    if has_high {
        return AlignmentQuality::Poor;
    }
    if alignment_score >= 0.85 && conflicts.is_empty() {
        AlignmentQuality::Excellent
    } else if alignment_score >= 0.75 && !has_moderate_or_worse {
        AlignmentQuality::Good
    } else if alignment_score >= 0.6 {
        AlignmentQuality::Fair
    } else {
        AlignmentQuality::Poor
    }
}

pub fn aggregate(context: &FullContext) -> AlignmentReport {
    let signals = extract_signals(context);

    let bullish = directional_score(&signals, Direction::Bullish);
    let bearish = directional_score(&signals, Direction::Bearish);
    let neutral = directional_score(&signals, Direction::Neutral);
    // Every signal contributes its weight*confidence to exactly one bucket,
    // so this is the total weighted-confidence mass that voted at all.
    let total_mass = bullish + bearish + neutral;

    let (dominant_direction, top_score) = [
        (Direction::Bullish, bullish),
        (Direction::Bearish, bearish),
        (Direction::Neutral, neutral),
    ]
    .into_iter()
    .fold((Direction::Neutral, f64::MIN), |best, candidate| {
        if candidate.1 > best.1 {
            candidate
        } else {
            best
        }
    });

    let alignment_score = if total_mass > f64::EPSILON {
        round2(top_score / total_mass)
    } else {
        0.0
    };

    let conflicts = detect_conflicts(&signals);
    let quality = quality_for(alignment_score, &conflicts);

    AlignmentReport {
        dominant_direction,
        alignment_score,
        conflicts,
        quality,
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(timeframe: &str, direction: Direction, confidence: f64, weight: f64) -> AlignmentSignal {
        AlignmentSignal {
            timeframe: analysis_core::Timeframe::parse(timeframe).unwrap(),
            regime_class: RegimeClass::Trending,
            direction,
            confidence,
            weight,
        }
    }

    #[test]
    fn weight_table_matches_spec() {
        assert_eq!(weight_for(analysis_core::Timeframe::parse("1d").unwrap()), 3.0);
        assert_eq!(weight_for(analysis_core::Timeframe::parse("1h").unwrap()), 1.5);
        assert_eq!(weight_for(analysis_core::Timeframe::parse("1m").unwrap()), 0.3);
    }

    #[test]
    fn seed_scenario_conflicting_timeframes_scores_bullish_with_high_severity_conflict() {
        // 1d bullish w=3.0/conf=0.8, 4h bearish w=2.0/conf=0.7, 1h bearish w=1.5/conf=0.6.
        let signals = vec![
            signal("1d", Direction::Bullish, 0.8, 3.0),
            signal("4h", Direction::Bearish, 0.7, 2.0),
            signal("1h", Direction::Bearish, 0.6, 1.5),
        ];
        let bullish = directional_score(&signals, Direction::Bullish);
        let bearish = directional_score(&signals, Direction::Bearish);
        assert!((bullish - 2.4).abs() < 1e-9);
        assert!((bearish - 2.3).abs() < 1e-9);
        let alignment_score = round2(bullish.max(bearish) / (bullish + bearish));
        assert!((alignment_score - 0.51).abs() < 0.01);

        let conflicts = detect_conflicts(&signals);
        assert!(conflicts.iter().any(|c| c.label == "high_timeframe_conflict"));
        let quality = quality_for(alignment_score, &conflicts);
        assert_eq!(quality, AlignmentQuality::Poor);
    }

    #[test]
    fn unanimous_signals_yield_excellent_quality() {
        let signals = vec![
            signal("1d", Direction::Bullish, 0.9, 3.0),
            signal("4h", Direction::Bullish, 0.85, 2.0),
            signal("1h", Direction::Bullish, 0.8, 1.5),
        ];
        let conflicts = detect_conflicts(&signals);
        assert!(conflicts.is_empty());
        let bullish = directional_score(&signals, Direction::Bullish);
        let alignment_score = round2(bullish / bullish);
        assert_eq!(quality_for(alignment_score, &conflicts), AlignmentQuality::Excellent);
    }

    #[test]
    fn one_vs_one_disagreement_is_low_severity_not_moderate() {
        // No weight >= 2.0 pair disagrees, so this is a plain directional
        // conflict with exactly one signal per side: severity must be `low`,
        // which keeps `good`/`excellent` quality reachable.
        let signals = vec![
            signal("30m", Direction::Bullish, 0.7, 1.0),
            signal("15m", Direction::Bearish, 0.6, 0.8),
        ];
        let conflicts = detect_conflicts(&signals);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].label, "directional_conflict");
        assert_eq!(conflicts[0].severity, ConflictSeverity::Low);
        assert_eq!(quality_for(0.9, &conflicts), AlignmentQuality::Good);
    }

    #[test]
    fn directional_conflict_is_moderate_when_both_sides_have_two_signals() {
        let signals = vec![
            signal("30m", Direction::Bullish, 0.7, 1.0),
            signal("15m", Direction::Bullish, 0.6, 0.8),
            signal("5m", Direction::Bearish, 0.6, 0.5),
            signal("1m", Direction::Bearish, 0.5, 0.3),
        ];
        let conflicts = detect_conflicts(&signals);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].label, "directional_conflict");
        assert_eq!(conflicts[0].severity, ConflictSeverity::Moderate);
    }

    #[test]
    fn htf_ltf_divergence_aggregates_dominant_heavy_direction() {
        // 1d bullish w=3.0 (HTF), 1h bearish w=1.5 (LTF, opposes), 5m bullish
        // w=0.3 (LTF, lightest but agrees). Comparing only the single
        // heaviest vs single lightest signal would miss this: both are
        // bullish. The dominant HTF direction (bullish, the only weight>=2.0
        // signal) is opposed by the 1h signal, so divergence must fire.
        let signals = vec![
            signal("1d", Direction::Bullish, 0.8, 3.0),
            signal("1h", Direction::Bearish, 0.6, 1.5),
            signal("5m", Direction::Bullish, 0.5, 0.3),
        ];
        let conflicts = detect_conflicts(&signals);
        assert!(conflicts.iter().any(|c| c.label == "htf_ltf_divergence"));
    }
}
