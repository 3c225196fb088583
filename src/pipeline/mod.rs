//! Survey orchestration and rate limiting.

mod rate_limit;
mod survey;

pub use rate_limit::RateLimiter;
pub use survey::{Survey, DEFAULT_RADIUS_KM};
