/// DataProvider configuration (§6).
#[derive(Debug, Clone)]
pub struct DataProviderConfig {
    pub max_data_points: usize,
    pub detect_gaps_default: bool,
    pub use_cache_default: bool,
}

impl Default for DataProviderConfig {
    fn default() -> Self {
        DataProviderConfig {
            max_data_points: 5_000,
            detect_gaps_default: true,
            use_cache_default: true,
        }
    }
}
