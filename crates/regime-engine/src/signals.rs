//! Steps B, C, D — ADX slope/phase, prior compression, direction.

use crate::config::RegimeEngineConfig;
use crate::types::{Compression, DirectionComponents, Direction, Phase, TrendPhase};

/// Step B. Simple linear regression of the last `adx_slope_period` ADX
/// values, slope normalized by their mean.
pub fn adx_slope_phase(config: &RegimeEngineConfig, adx_history: &[f64]) -> TrendPhase {
    let n = config.adx_slope_period;
    if adx_history.len() < n || n < 2 {
        return TrendPhase {
            adx_slope: 0.0,
            phase: Phase::Unknown,
        };
    }
    let window = &adx_history[adx_history.len() - n..];
    let mean_x = (n as f64 - 1.0) / 2.0;
    let mean_y = window.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in window.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    let slope = if den.abs() > f64::EPSILON { num / den } else { 0.0 };
    let normalized = if mean_y.abs() > f64::EPSILON {
        slope / mean_y
    } else {
        0.0
    };

    let phase = if normalized > config.adx_slope_threshold {
        Phase::Nascent
    } else if normalized < -config.adx_slope_threshold {
        Phase::Exhausted
    } else {
        Phase::Mature
    };

    TrendPhase {
        adx_slope: normalized,
        phase,
    }
}

/// Step C. Looks at the `compression_window` bars preceding the current
/// one (i.e. excludes the current bar).
pub fn prior_compression(config: &RegimeEngineConfig, atr_ratio_history: &[f64]) -> Option<Compression> {
    if atr_ratio_history.len() <= config.compression_window {
        return None;
    }
    let prior = &atr_ratio_history[atr_ratio_history.len() - 1 - config.compression_window
        ..atr_ratio_history.len() - 1];
    let below = prior
        .iter()
        .filter(|&&r| r < config.compression_threshold)
        .count();
    let ratio = below as f64 / prior.len() as f64;
    let minimum = prior.iter().cloned().fold(f64::INFINITY, f64::min);
    Some(Compression {
        detected: ratio >= 0.5,
        ratio,
        minimum,
    })
}

/// Step D. DI override downgrades a directional call to neutral when the
/// DI spread disagrees with it by more than 10 points.
pub fn direction(
    price: f64,
    ema_short: f64,
    ema_long: f64,
    plus_di: f64,
    minus_di: f64,
    atr_long: f64,
) -> (Direction, DirectionComponents) {
    let mut dir = if price > ema_short && ema_short > ema_long {
        Direction::Bullish
    } else if price < ema_short && ema_short < ema_long {
        Direction::Bearish
    } else {
        Direction::Neutral
    };

    let di_spread = plus_di - minus_di;
    match dir {
        Direction::Bullish if di_spread < -10.0 => dir = Direction::Neutral,
        Direction::Bearish if di_spread > 10.0 => dir = Direction::Neutral,
        _ => {}
    }

    let strength = if atr_long.abs() > f64::EPSILON {
        ((ema_short - ema_long) / atr_long).clamp(-2.0, 2.0)
    } else {
        0.0
    };

    (
        dir,
        DirectionComponents {
            strength,
            ema_short,
            ema_long,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_adx_is_nascent() {
        let config = RegimeEngineConfig::default();
        let history: Vec<f64> = vec![18.0, 20.0, 22.0, 24.0, 26.0];
        let phase = adx_slope_phase(&config, &history);
        assert_eq!(phase.phase, Phase::Nascent);
    }

    #[test]
    fn flat_adx_is_mature() {
        let config = RegimeEngineConfig::default();
        let history: Vec<f64> = vec![25.0, 25.1, 24.9, 25.0, 25.05];
        let phase = adx_slope_phase(&config, &history);
        assert_eq!(phase.phase, Phase::Mature);
    }

    #[test]
    fn bullish_direction_requires_price_above_both_emas() {
        let (dir, comp) = direction(110.0, 105.0, 100.0, 30.0, 12.0, 2.0);
        assert_eq!(dir, Direction::Bullish);
        assert!(comp.strength > 0.0);
    }

    #[test]
    fn di_override_downgrades_to_neutral() {
        let (dir, _) = direction(110.0, 105.0, 100.0, 10.0, 25.0, 2.0);
        assert_eq!(dir, Direction::Neutral);
    }

    #[test]
    fn compression_detected_when_majority_below_threshold() {
        let config = RegimeEngineConfig::default();
        let mut history = vec![0.6; 10];
        history.push(1.0);
        let compression = prior_compression(&config, &history).unwrap();
        assert!(compression.detected);
    }
}
