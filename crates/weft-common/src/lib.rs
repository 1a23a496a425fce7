//! # weft-common
//!
//! Shared configuration, error handling, and telemetry.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, DirectoryConfig, DiscoveryConfig,
    Environment, GatewayConfig, QueueConfig, RedisConfig, ServerConfig, SessionConfig,
    SnowflakeConfig, StorageConfig,
};
pub use error::{AppError, AppResult, ErrorBody};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
