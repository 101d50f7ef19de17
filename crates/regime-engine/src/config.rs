/// Which volatility-multiplier formula Step A uses. Two candidate formulas
/// were found upstream (`0.5 + ratio·0.5` vs `0.7 + ratio·0.6`); both are
/// kept, `Default` is the resolved choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityFormula {
    Legacy,
    Default,
}

impl VolatilityFormula {
    pub fn apply(&self, ratio: f64) -> f64 {
        match self {
            VolatilityFormula::Legacy => 0.5 + ratio * 0.5,
            VolatilityFormula::Default => 0.7 + ratio * 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VolatilityBounds {
    pub min_multiplier: f64,
    pub max_multiplier: f64,
}

impl Default for VolatilityBounds {
    fn default() -> Self {
        VolatilityBounds {
            min_multiplier: 0.7,
            max_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdaptiveConfig {
    pub enabled: bool,
    pub volatility_window: usize,
    pub volatility: VolatilityBounds,
    pub volatility_formula: VolatilityFormula,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        AdaptiveConfig {
            enabled: true,
            volatility_window: 100,
            volatility: VolatilityBounds::default(),
            volatility_formula: VolatilityFormula::Default,
        }
    }
}

/// RegimeEngine configuration (§6).
#[derive(Debug, Clone, Copy)]
pub struct RegimeEngineConfig {
    pub adx_period: usize,
    pub er_period: usize,
    pub er_smooth_period: usize,
    pub atr_short_period: usize,
    pub atr_long_period: usize,
    pub ma_short_period: usize,
    pub ma_long_period: usize,
    pub adx_slope_period: usize,
    pub adx_slope_threshold: f64,
    pub volume_period: usize,
    pub volume_spike_threshold: f64,
    pub compression_window: usize,
    pub compression_threshold: f64,
    pub adaptive: AdaptiveConfig,
    pub min_bars: usize,
}

impl Default for RegimeEngineConfig {
    fn default() -> Self {
        RegimeEngineConfig {
            adx_period: 14,
            er_period: 10,
            er_smooth_period: 3,
            atr_short_period: 14,
            atr_long_period: 50,
            ma_short_period: 20,
            ma_long_period: 50,
            adx_slope_period: 5,
            adx_slope_threshold: 0.02,
            volume_period: 20,
            volume_spike_threshold: 1.5,
            compression_window: 10,
            compression_threshold: 0.7,
            adaptive: AdaptiveConfig::default(),
            min_bars: 60,
        }
    }
}
