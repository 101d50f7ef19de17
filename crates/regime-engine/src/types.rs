use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    TrendingBullish,
    TrendingBearish,
    TrendingNeutral,
    RangeNormal,
    RangeLowVol,
    RangeHighVol,
    RangeDirectional,
    BreakoutBullish,
    BreakoutBearish,
    BreakoutNeutral,
}

impl Regime {
    pub fn is_breakout(&self) -> bool {
        matches!(
            self,
            Regime::BreakoutBullish | Regime::BreakoutBearish | Regime::BreakoutNeutral
        )
    }

    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Regime::RangeNormal | Regime::RangeLowVol | Regime::RangeHighVol | Regime::RangeDirectional
        )
    }

    pub fn is_trending(&self) -> bool {
        matches!(
            self,
            Regime::TrendingBullish | Regime::TrendingBearish | Regime::TrendingNeutral
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Nascent,
    Mature,
    Exhausted,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakoutGrade {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    NearResistance,
    NearSupport,
    UpperHalf,
    LowerHalf,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStrength {
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMethod {
    SwingClusters,
    MinmaxFallback,
}

#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub adx_weak: f64,
    pub adx_trending: f64,
    pub adx_strong: f64,
    pub er_choppy: f64,
    pub er_trending: f64,
    pub atr_ratio_low: f64,
    pub atr_ratio_high: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionComponents {
    pub strength: f64,
    pub ema_short: f64,
    pub ema_long: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Components {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub efficiency_ratio: f64,
    pub atr_ratio: f64,
    pub direction: DirectionComponents,
}

#[derive(Debug, Clone, Copy)]
pub struct TrendPhase {
    pub adx_slope: f64,
    pub phase: Phase,
}

#[derive(Debug, Clone, Copy)]
pub struct VolumeAnalysis {
    pub spike: bool,
    pub trend_rising: bool,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Compression {
    pub detected: bool,
    pub ratio: f64,
    pub minimum: f64,
}

#[derive(Debug, Clone)]
pub struct BreakoutQuality {
    pub score: i32,
    pub grade: BreakoutGrade,
    pub factors: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct PriceCluster {
    pub avg_price: f64,
    pub touches: usize,
    pub first_index: usize,
    pub last_index: usize,
}

#[derive(Debug, Clone)]
pub struct RangeBounds {
    pub support: f64,
    pub resistance: f64,
    pub width: f64,
    pub position: f64,
    pub width_atr: f64,
    pub proximity: Proximity,
    pub strength: RangeStrength,
    pub method: RangeMethod,
    pub additional_support: Vec<PriceCluster>,
    pub additional_resistance: Vec<PriceCluster>,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoringDetails {
    pub regime_clarity: f64,
    pub er_score: f64,
    pub direction_score: f64,
    pub coherence: f64,
    pub phase_bonus: f64,
}

#[derive(Debug, Clone)]
pub struct RegimeMetadata {
    pub symbol: String,
    pub timeframe: String,
    pub bars_analyzed: usize,
    pub reference_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct RegimeResult {
    pub regime: Regime,
    pub direction: Direction,
    pub confidence: f64,
    pub components: Components,
    pub thresholds: Thresholds,
    pub trend_phase: TrendPhase,
    pub volume_analysis: Option<VolumeAnalysis>,
    pub compression: Option<Compression>,
    pub breakout_quality: Option<BreakoutQuality>,
    pub range_bounds: Option<RangeBounds>,
    pub scoring_details: ScoringDetails,
    pub metadata: RegimeMetadata,
}

#[derive(Debug, Clone)]
pub struct RegimeRequest {
    pub symbol: String,
    pub timeframe: analysis_core::Timeframe,
    pub count: usize,
    pub reference_date: Option<DateTime<Utc>>,
    pub use_cache: Option<bool>,
    pub detect_gaps: Option<bool>,
}

impl RegimeRequest {
    pub fn new(symbol: impl Into<String>, timeframe: analysis_core::Timeframe, count: usize) -> Self {
        RegimeRequest {
            symbol: symbol.into(),
            timeframe,
            count,
            reference_date: None,
            use_cache: None,
            detect_gaps: None,
        }
    }
}
