//! `NarrativeProjector` (§4.8): a pure transform from a `FullContext` +
//! `AlignmentReport` pair down to the compact, human-scannable report. No
//! indicator or cache access happens here.

use regime_engine::{Direction, Phase};

use crate::types::{
    AlignmentReport, ConflictSeverity, FullContext, NarrativeAlignment, NarrativeReport, Strength,
};

fn strength_for(alignment: &AlignmentReport) -> Strength {
    let has_high_conflict = alignment
        .conflicts
        .iter()
        .any(|c| c.severity == ConflictSeverity::High);
    if has_high_conflict {
        return Strength::Conflicting;
    }
    if alignment.alignment_score >= 0.75 {
        Strength::Strong
    } else if alignment.alignment_score >= 0.55 {
        Strength::Moderate
    } else {
        Strength::Weak
    }
}

fn market_state(context: &FullContext) -> Option<String> {
    let primary = context.timeframes.first()?;
    let regime = &primary.regime.regime;
    let direction = match primary.regime.direction {
        Direction::Bullish => "bullish",
        Direction::Bearish => "bearish",
        Direction::Neutral => "neutral",
    };
    let descriptor = if regime.is_trending() {
        "trending"
    } else if regime.is_breakout() {
        "breaking out"
    } else {
        "ranging"
    };
    Some(format!(
        "{} is {} with {} direction (confidence {:.2})",
        primary.timeframe, descriptor, direction, primary.regime.confidence
    ))
}

fn cross_timeframe(alignment: &AlignmentReport) -> Option<String> {
    if alignment.signals.is_empty() {
        return None;
    }
    let direction = match alignment.dominant_direction {
        Direction::Bullish => "bullish",
        Direction::Bearish => "bearish",
        Direction::Neutral => "mixed",
    };
    Some(format!(
        "timeframes lean {} (alignment {:.2}, {} quality)",
        direction,
        alignment.alignment_score,
        quality_label(alignment.quality)
    ))
}

fn quality_label(quality: crate::types::AlignmentQuality) -> &'static str {
    use crate::types::AlignmentQuality::*;
    match quality {
        Excellent => "excellent",
        Good => "good",
        Fair => "fair",
        Poor => "poor",
    }
}

fn momentum_phase(context: &FullContext) -> Option<String> {
    let primary = context.timeframes.first()?;
    let phase = match primary.regime.trend_phase.phase {
        Phase::Nascent => "nascent",
        Phase::Mature => "mature",
        Phase::Exhausted => "exhausted",
        Phase::Unknown => return None,
    };
    Some(format!("trend phase is {}", phase))
}

fn key_levels(context: &FullContext) -> Option<String> {
    let primary = context.timeframes.first()?;
    let sr = primary.support_resistance.as_ref();
    let range = primary.regime.range_bounds.as_ref();
    match (sr, range) {
        (_, Some(r)) => Some(format!("support {:.4} / resistance {:.4}", r.support, r.resistance)),
        (Some(s), None) => Some(format!(
            "ema support {:.4} / ema resistance {:.4}",
            s.ema_support, s.ema_resistance
        )),
        (None, None) => None,
    }
}

fn watch_for(context: &FullContext, alignment: &AlignmentReport) -> Option<String> {
    if let Some(worst) = alignment
        .conflicts
        .iter()
        .max_by_key(|c| match c.severity {
            ConflictSeverity::High => 2,
            ConflictSeverity::Moderate => 1,
            ConflictSeverity::Low => 0,
        })
    {
        return Some(format!("{} between timeframes", worst.label));
    }
    let primary = context.timeframes.first()?;
    if let Some(bq) = primary.regime.breakout_quality.as_ref() {
        return Some(format!("breakout follow-through ({:?} grade)", bq.grade));
    }
    None
}

pub fn project(context: &FullContext, alignment: &AlignmentReport) -> NarrativeReport {
    let conflicts = alignment
        .conflicts
        .iter()
        .map(|c| c.label.to_string())
        .collect::<Vec<_>>();

    NarrativeReport {
        alignment: Some(NarrativeAlignment {
            direction: alignment.dominant_direction,
            strength: strength_for(alignment),
            score: alignment.alignment_score,
            conflicts,
        }),
        market_state: market_state(context),
        cross_timeframe: cross_timeframe(alignment),
        momentum_phase: momentum_phase(context),
        key_levels: key_levels(context),
        watch_for: watch_for(context, alignment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlignmentQuality, AlignmentSignal, Conflict, RegimeClass};

    fn empty_alignment() -> AlignmentReport {
        AlignmentReport {
            dominant_direction: Direction::Neutral,
            alignment_score: 0.0,
            conflicts: vec![],
            quality: AlignmentQuality::Poor,
            signals: vec![],
        }
    }

    #[test]
    fn strength_is_conflicting_when_a_high_severity_conflict_exists() {
        let mut alignment = empty_alignment();
        alignment.alignment_score = 0.9;
        alignment.conflicts.push(Conflict {
            label: "high_timeframe_conflict",
            severity: ConflictSeverity::High,
        });
        assert_eq!(strength_for(&alignment), Strength::Conflicting);
    }

    #[test]
    fn empty_context_yields_no_narrative_lines() {
        let context = FullContext::default();
        let alignment = empty_alignment();
        let report = project(&context, &alignment);
        assert!(report.market_state.is_none());
        assert!(report.cross_timeframe.is_none());
        assert!(report.alignment.is_some());
    }

    #[test]
    fn cross_timeframe_reports_dominant_direction() {
        let mut alignment = empty_alignment();
        alignment.dominant_direction = Direction::Bullish;
        alignment.alignment_score = 0.7;
        alignment.quality = AlignmentQuality::Good;
        alignment.signals.push(AlignmentSignal {
            timeframe: analysis_core::Timeframe::parse("1d").unwrap(),
            regime_class: RegimeClass::Trending,
            direction: Direction::Bullish,
            confidence: 0.8,
            weight: 3.0,
        });
        let context = FullContext::default();
        let report = project(&context, &alignment);
        assert!(report.cross_timeframe.unwrap().contains("bullish"));
    }
}
