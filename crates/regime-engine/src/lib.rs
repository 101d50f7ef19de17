pub mod classify;
pub mod config;
pub mod confidence;
pub mod engine;
pub mod range_bounds;
pub mod signals;
pub mod smoothing;
pub mod thresholds;
pub mod types;

pub use config::{AdaptiveConfig, RegimeEngineConfig, VolatilityBounds, VolatilityFormula};
pub use engine::RegimeEngine;
pub use types::{
    BreakoutGrade, BreakoutQuality, Components, Compression, Direction, DirectionComponents,
    Phase, PriceCluster, Proximity, Regime, RangeBounds, RangeMethod, RangeStrength,
    RegimeMetadata, RegimeRequest, RegimeResult, ScoringDetails, Thresholds, TrendPhase,
    VolumeAnalysis,
};
