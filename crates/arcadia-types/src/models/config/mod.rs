//! Application configuration models.

mod ai;
mod app;
mod http;
mod logging;
mod pool;
mod reliability;

pub use ai::{AiConfig, AiProvider};
pub use app::{AppConfig, Credentials, DISCORD_LIMITER, IGDB_LIMITER, STEAM_LIMITER};
pub use http::HttpClientConfig;
pub use logging::LogConfig;
pub use pool::PoolConfig;
pub use reliability::{RateLimitConfig, RetryConfig};
