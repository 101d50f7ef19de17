//! A local EMA pass for the extra Efficiency-Ratio smoothing step the
//! `IndicatorEngine` contract doesn't expose directly (ER comes back raw;
//! the regime call needs it EMA-smoothed with a second period). Kept local
//! rather than pulled in from `technical-analysis` to preserve the
//! boundary noted in the design notes: `RegimeEngine` only talks to its
//! collaborators through `IndicatorEngine`/`MarketAdapter`.

/// Same seed-then-recurse shape as `technical-analysis::indicators::ema`,
/// operating on an already-present (non-`None`) value slice.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.is_empty() {
        return vec![];
    }
    if data.len() < period {
        let avg = data.iter().sum::<f64>() / data.len() as f64;
        return vec![avg];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed: f64 = data[..period].iter().sum::<f64>() / period as f64;
    let mut result = Vec::with_capacity(data.len() - period + 1);
    result.push(seed);
    for &value in &data[period..] {
        let prev = *result.last().unwrap();
        result.push((value - prev) * multiplier + prev);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooths_toward_the_most_recent_value() {
        let data = vec![0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        let smoothed = ema(&data, 3);
        assert!(!smoothed.is_empty());
        assert!(*smoothed.last().unwrap() > 0.4);
    }

    #[test]
    fn short_series_falls_back_to_a_simple_average() {
        let data = vec![0.5, 0.6];
        let smoothed = ema(&data, 3);
        assert_eq!(smoothed.len(), 1);
    }
}
