pub mod adaptive;
pub mod error;
pub mod market;
pub mod timeframe;
pub mod types;

pub use error::*;
pub use market::*;
pub use timeframe::{TimeUnit, Timeframe};
pub use types::*;
