pub mod alignment;
pub mod analyze;
pub mod config;
pub mod context;
pub mod enrichers;
pub mod narrative;
pub mod types;

pub use alignment::aggregate as aggregate_alignment;
pub use analyze::{analyze, MarketContextResult};
pub use config::{ContextConfig, LookbackPeriods};
pub use context::StatisticalContext;
pub use narrative::project as project_narrative;
pub use types::{
    AdxSummary, AlignmentQuality, AlignmentReport, AlignmentSignal, CoherenceCheck,
    CoherenceStatus, Conflict, ConflictSeverity, Depth, FullContext, MicroPattern,
    MomentumSummary, MovingAverageSummary, NarrativeAlignment, NarrativeReport,
    PriceActionBasic, PriceActionDetailed, PsarState, RegimeClass, Severity, Strength,
    Structure, SupportResistanceSummary, TimeframeContext, TimeframeSet, VolatilitySummary,
};
