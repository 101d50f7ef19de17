pub mod fixture;
pub mod polygon;
pub mod rate_limiter;

pub use fixture::FixtureAdapter;
pub use polygon::PolygonAdapter;
pub use rate_limiter::RateLimiter;
