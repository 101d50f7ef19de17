use analysis_core::Timeframe;
use regime_engine::{Direction, Regime, RegimeResult};

/// Requested timeframe set (§4.6): at least one of the three must be present.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeframeSet {
    pub long: Option<Timeframe>,
    pub medium: Option<Timeframe>,
    pub short: Option<Timeframe>,
}

impl TimeframeSet {
    /// Present timeframes, longest-duration first, per the §5 processing order.
    pub fn longest_to_shortest(&self) -> Vec<Timeframe> {
        let mut tfs: Vec<Timeframe> = [self.long, self.medium, self.short]
            .into_iter()
            .flatten()
            .collect();
        tfs.sort_by_key(|tf| std::cmp::Reverse(tf.to_millis()));
        tfs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Light,
    Medium,
    Full,
}

impl Depth {
    /// `minutes >= 1440 -> light`, `240 <= minutes < 1440 -> medium`, else `full`.
    pub fn for_timeframe(timeframe: Timeframe) -> Self {
        let minutes = timeframe.to_minutes();
        if minutes >= 1_440 {
            Depth::Light
        } else if minutes >= 240 {
            Depth::Medium
        } else {
            Depth::Full
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MovingAverageSummary {
    pub sma_short: f64,
    pub sma_long: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    pub golden_cross: bool,
    pub price_above_both: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AdxSummary {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub strong: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy)]
pub struct PriceActionBasic {
    pub current_close: f64,
    pub daily_change_pct: f64,
    pub structure: Structure,
}

#[derive(Debug, Clone, Copy)]
pub struct PriceActionDetailed {
    pub recent_high: f64,
    pub recent_low: f64,
    pub higher_highs: bool,
    pub higher_lows: bool,
    pub structure: Structure,
}

#[derive(Debug, Clone, Copy)]
pub struct MomentumSummary {
    pub rsi: f64,
    pub macd_histogram: f64,
    pub rising: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct VolatilitySummary {
    pub atr: f64,
    pub atr_pct: f64,
    pub bb_width: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PsarState {
    pub value: f64,
    pub price_above: bool,
}

#[derive(Debug, Clone)]
pub struct SupportResistanceSummary {
    pub ema_support: f64,
    pub ema_resistance: f64,
    pub range_support: Option<f64>,
    pub range_resistance: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MicroPattern {
    pub pattern: &'static str,
    pub confidence: f64,
    pub implication: &'static str,
    pub invalidation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoherenceStatus {
    Coherent,
    Diverging,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    None,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct CoherenceCheck {
    pub status: CoherenceStatus,
    pub divergences: Vec<&'static str>,
    pub severity: Severity,
}

/// Per-timeframe enrichment, depth-gated per §4.6.
#[derive(Debug, Clone)]
pub struct TimeframeContext {
    pub timeframe: Timeframe,
    pub depth: Depth,
    pub regime: RegimeResult,
    pub moving_averages: MovingAverageSummary,
    pub adx_summary: AdxSummary,
    pub price_action_basic: Option<PriceActionBasic>,
    pub momentum: Option<MomentumSummary>,
    pub volatility: Option<VolatilitySummary>,
    pub psar: Option<PsarState>,
    pub price_action_detailed: Option<PriceActionDetailed>,
    pub support_resistance: Option<SupportResistanceSummary>,
    pub micro_patterns: Option<Vec<MicroPattern>>,
    pub coherence: Option<CoherenceCheck>,
}

/// Full, per-call, depth-gated multi-timeframe enrichment (§4.6 output).
#[derive(Debug, Clone, Default)]
pub struct FullContext {
    pub timeframes: Vec<TimeframeContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegimeClass {
    Trending,
    Breakout,
    Range,
    Unknown,
}

impl From<Regime> for RegimeClass {
    fn from(regime: Regime) -> Self {
        if regime.is_trending() {
            RegimeClass::Trending
        } else if regime.is_breakout() {
            RegimeClass::Breakout
        } else if regime.is_range() {
            RegimeClass::Range
        } else {
            RegimeClass::Unknown
        }
    }
}

/// One timeframe's contribution to the alignment vote (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct AlignmentSignal {
    pub timeframe: Timeframe,
    pub regime_class: RegimeClass,
    pub direction: Direction,
    pub confidence: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictSeverity {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone)]
pub struct Conflict {
    pub label: &'static str,
    pub severity: ConflictSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone)]
pub struct AlignmentReport {
    pub dominant_direction: Direction,
    pub alignment_score: f64,
    pub conflicts: Vec<Conflict>,
    pub quality: AlignmentQuality,
    pub signals: Vec<AlignmentSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
    Conflicting,
}

#[derive(Debug, Clone)]
pub struct NarrativeAlignment {
    pub direction: Direction,
    pub strength: Strength,
    pub score: f64,
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NarrativeReport {
    pub alignment: Option<NarrativeAlignment>,
    pub market_state: Option<String>,
    pub cross_timeframe: Option<String>,
    pub momentum_phase: Option<String>,
    pub key_levels: Option<String>,
    pub watch_for: Option<String>,
}
