use analysis_core::Timeframe;
use std::collections::HashMap;

/// Per-indicator lookback periods the enrichers use (§6 Context option
/// group's `lookback_periods`).
#[derive(Debug, Clone, Copy)]
pub struct LookbackPeriods {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi: usize,
    pub atr: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for LookbackPeriods {
    fn default() -> Self {
        LookbackPeriods {
            sma_short: 20,
            sma_long: 50,
            rsi: 14,
            atr: 14,
            bb_period: 20,
            bb_std_dev: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

/// `StatisticalContext`/`AlignmentAggregator`/`NarrativeProjector` configuration (§6).
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub context_timeout_ms: u64,
    /// Per-timeframe OHLCV bar budget passed to `DataProvider` for the enrichers.
    pub ohlcv_bar_counts: HashMap<&'static str, usize>,
    /// Per-timeframe bar budget passed as `RegimeRequest.count`; `RegimeEngine`
    /// itself pads this with 50 bars of warmup on top.
    pub indicator_bar_counts: HashMap<&'static str, usize>,
    pub lookback_periods: LookbackPeriods,
}

fn default_bar_counts() -> HashMap<&'static str, usize> {
    [
        ("5m", 300),
        ("15m", 300),
        ("30m", 250),
        ("1h", 250),
        ("4h", 200),
        ("1d", 150),
        ("1w", 100),
        ("1M", 60),
    ]
    .into_iter()
    .collect()
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            context_timeout_ms: 60_000,
            ohlcv_bar_counts: default_bar_counts(),
            indicator_bar_counts: default_bar_counts(),
            lookback_periods: LookbackPeriods::default(),
        }
    }
}

impl ContextConfig {
    pub fn bar_count_for(&self, timeframe: Timeframe) -> usize {
        self.ohlcv_bar_counts
            .get(timeframe.to_string().as_str())
            .copied()
            .unwrap_or(200)
    }

    pub fn indicator_count_for(&self, timeframe: Timeframe) -> usize {
        self.indicator_bar_counts
            .get(timeframe.to_string().as_str())
            .copied()
            .unwrap_or(200)
    }
}
