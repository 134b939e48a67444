pub mod rate;

pub use rate::{ActionRateLimiter, RateLimitConfig, RateLimitDecision};
