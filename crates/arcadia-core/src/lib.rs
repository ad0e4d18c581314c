//! # Arcadia Core
//!
//! Resource & reliability layer for the Arcadia bot.
//!
//! ```text
//! feature code
//!   ├── clients/       Steam / IGDB / RAWG consumers
//!   │     └── reliability::GuardedCall
//!   │           ├── retry         exponential backoff (outermost)
//!   │           ├── rate_limiter  sliding-window admission, per attempt
//!   │           └── http          shared pooled session, per attempt
//!   ├── modules/       JSON store, data manager, config, logging, validators
//!   ├── pool/          bounded browser-process pool
//!   └── services.rs    composition root owning all of the above
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "Lock guards are scoped by hand around short critical sections"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![allow(
    clippy::redundant_else,
    reason = "Explicit else blocks improve readability in complex control flow"
)]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::float_cmp,
        clippy::needless_collect,
        clippy::assertions_on_result_states
    )
)]

pub mod clients;
pub mod error;
pub mod http;
pub mod modules;
pub mod pool;
pub mod reliability;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use http::SharedHttpClient;
pub use modules::storage::JsonStore;
pub use pool::{PoolStats, PooledHandle, ResourceManager, ResourcePool};
pub use reliability::{
    retry_async, retry_async_if, GuardedCall, RateLimiterRegistry, RetryPolicy, SlidingWindowLimiter,
};
pub use services::Services;
