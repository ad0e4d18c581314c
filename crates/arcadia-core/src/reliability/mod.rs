//! Admission control and retry.
//!
//! Composition order for outbound calls is fixed: the retry loop sits outside, and every
//! attempt re-enters rate-limit admission before touching the shared session
//! (see [`guarded::GuardedCall`]).

pub mod guarded;
pub mod rate_limiter;
pub mod registry;
pub mod retry;

pub use guarded::GuardedCall;
pub use rate_limiter::SlidingWindowLimiter;
pub use registry::RateLimiterRegistry;
pub use retry::{retry_async, retry_async_if, RetryPolicy};
