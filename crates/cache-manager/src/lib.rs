pub mod config;
pub mod manager;
pub mod segment;

pub use config::CacheConfig;
pub use manager::{
    CacheCounters, CacheGetResult, CacheManager, CacheStats, Coverage, KeyStats, MissingRanges,
    TimestampRange,
};
pub use segment::CacheSegment;
