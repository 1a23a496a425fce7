//! Application configuration, loaded from environment variables.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Top-level configuration shared by every weft service.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub gateway: GatewayConfig,
    pub directory: DirectoryConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub queue: QueueConfig,
    pub discovery: DiscoveryConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub snowflake: SnowflakeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Bind address for a plain HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Gateway (connect layer) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// WebSocket listener port.
    pub ws_port: u16,
    /// Framed-TCP listener port.
    pub tcp_port: u16,
    /// Internal RPC listener port.
    pub rpc_port: u16,
    /// Identity under which this instance registers in discovery.
    pub server_id: String,
    #[serde(default = "default_bucket_count")]
    pub bucket_count: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: i64,
    /// Capacity of each channel's outbound frame queue.
    #[serde(default = "default_broadcast_size")]
    pub broadcast_size: usize,
    #[serde(default = "default_write_wait_secs")]
    pub write_wait_secs: u64,
    #[serde(default = "default_pong_wait_secs")]
    pub pong_wait_secs: u64,
    #[serde(default = "default_ping_period_secs")]
    pub ping_period_secs: u64,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl GatewayConfig {
    #[must_use]
    pub fn ws_address(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }

    #[must_use]
    pub fn tcp_address(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }

    #[must_use]
    pub fn rpc_address(&self) -> String {
        format!("{}:{}", self.host, self.rpc_port)
    }

    #[must_use]
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }

    #[must_use]
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    #[must_use]
    pub fn ping_period(&self) -> Duration {
        Duration::from_secs(self.ping_period_secs)
    }
}

/// Where the directory RPC server lives.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub rpc_port: u16,
}

impl DirectoryConfig {
    #[must_use]
    pub fn rpc_address(&self) -> String {
        format!("{}:{}", self.host, self.rpc_port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Queue (Redis Streams broker) tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_prefetch")]
    pub prefetch: usize,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Approximate per-stream retention, in entries.
    #[serde(default = "default_stream_max_len")]
    pub stream_max_len: usize,
}

impl QueueConfig {
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Gateway registration / dispatcher watch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_registration_ttl_secs")]
    pub registration_ttl_secs: u64,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,
}

impl DiscoveryConfig {
    #[must_use]
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    #[must_use]
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// TTL of `session:{token}` entries, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    /// TTL of the front-end's process-local token cache, in seconds.
    #[serde(default = "default_token_cache_ttl_secs")]
    pub token_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeConfig {
    #[serde(default)]
    pub worker_id: u16,
}

fn default_app_name() -> String {
    "weft".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bucket_count() -> usize {
    32
}

fn default_max_connections() -> i64 {
    10_000
}

fn default_broadcast_size() -> usize {
    512
}

fn default_write_wait_secs() -> u64 {
    10
}

fn default_pong_wait_secs() -> u64 {
    60
}

fn default_ping_period_secs() -> u64 {
    54
}

fn default_max_message_size() -> usize {
    512
}

fn default_db_max_connections() -> u32 {
    20
}

fn default_db_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    16
}

fn default_prefetch() -> usize {
    64
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_stream_max_len() -> usize {
    100_000
}

fn default_registration_ttl_secs() -> u64 {
    15
}

fn default_heartbeat_secs() -> u64 {
    5
}

fn default_watch_interval_secs() -> u64 {
    3
}

fn default_session_ttl_secs() -> u64 {
    7 * 24 * 3600
}

fn default_token_cache_ttl_secs() -> u64 {
    30
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_max_file_size() -> u32 {
    10
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl AppConfig {
    /// Load configuration from environment variables (`.env` honored when
    /// present).
    ///
    /// # Errors
    /// Returns an error when a required variable is missing or unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            api: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| default_host()),
                port: env_parsed("API_PORT").ok_or(ConfigError::MissingVar("API_PORT"))?,
            },
            gateway: GatewayConfig {
                host: env::var("GATEWAY_HOST").unwrap_or_else(|_| default_host()),
                ws_port: env_parsed("GATEWAY_WS_PORT")
                    .ok_or(ConfigError::MissingVar("GATEWAY_WS_PORT"))?,
                tcp_port: env_parsed("GATEWAY_TCP_PORT")
                    .ok_or(ConfigError::MissingVar("GATEWAY_TCP_PORT"))?,
                rpc_port: env_parsed("GATEWAY_RPC_PORT")
                    .ok_or(ConfigError::MissingVar("GATEWAY_RPC_PORT"))?,
                server_id: env::var("GATEWAY_SERVER_ID")
                    .map_err(|_| ConfigError::MissingVar("GATEWAY_SERVER_ID"))?,
                bucket_count: env_parsed("GATEWAY_BUCKET_COUNT")
                    .unwrap_or_else(default_bucket_count),
                max_connections: env_parsed("GATEWAY_MAX_CONNECTIONS")
                    .unwrap_or_else(default_max_connections),
                broadcast_size: env_parsed("GATEWAY_BROADCAST_SIZE")
                    .unwrap_or_else(default_broadcast_size),
                write_wait_secs: env_parsed("GATEWAY_WRITE_WAIT_SECS")
                    .unwrap_or_else(default_write_wait_secs),
                pong_wait_secs: env_parsed("GATEWAY_PONG_WAIT_SECS")
                    .unwrap_or_else(default_pong_wait_secs),
                ping_period_secs: env_parsed("GATEWAY_PING_PERIOD_SECS")
                    .unwrap_or_else(default_ping_period_secs),
                max_message_size: env_parsed("GATEWAY_MAX_MESSAGE_SIZE")
                    .unwrap_or_else(default_max_message_size),
            },
            directory: DirectoryConfig {
                host: env::var("DIRECTORY_HOST").unwrap_or_else(|_| default_host()),
                rpc_port: env_parsed("DIRECTORY_RPC_PORT")
                    .ok_or(ConfigError::MissingVar("DIRECTORY_RPC_PORT"))?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: env_parsed("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(default_db_max_connections),
                min_connections: env_parsed("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(default_db_min_connections),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: env_parsed("REDIS_MAX_CONNECTIONS")
                    .unwrap_or_else(default_redis_max_connections),
            },
            queue: QueueConfig {
                prefetch: env_parsed("QUEUE_PREFETCH").unwrap_or_else(default_prefetch),
                reconnect_delay_ms: env_parsed("QUEUE_RECONNECT_DELAY_MS")
                    .unwrap_or_else(default_reconnect_delay_ms),
                stream_max_len: env_parsed("QUEUE_STREAM_MAX_LEN")
                    .unwrap_or_else(default_stream_max_len),
            },
            discovery: DiscoveryConfig {
                registration_ttl_secs: env_parsed("DISCOVERY_REGISTRATION_TTL_SECS")
                    .unwrap_or_else(default_registration_ttl_secs),
                heartbeat_secs: env_parsed("DISCOVERY_HEARTBEAT_SECS")
                    .unwrap_or_else(default_heartbeat_secs),
                watch_interval_secs: env_parsed("DISCOVERY_WATCH_INTERVAL_SECS")
                    .unwrap_or_else(default_watch_interval_secs),
            },
            session: SessionConfig {
                ttl_secs: env_parsed("SESSION_TTL_SECS").unwrap_or_else(default_session_ttl_secs),
                token_cache_ttl_secs: env_parsed("TOKEN_CACHE_TTL_SECS")
                    .unwrap_or_else(default_token_cache_ttl_secs),
            },
            storage: StorageConfig {
                upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| default_upload_dir()),
                max_file_size_mb: env_parsed("MAX_FILE_SIZE_MB")
                    .unwrap_or_else(default_max_file_size),
            },
            snowflake: SnowflakeConfig {
                worker_id: env_parsed("WORKER_ID").unwrap_or(0),
            },
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_address_formats_host_and_port() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 7070,
        };
        assert_eq!(config.address(), "0.0.0.0:7070");
    }

    #[test]
    fn gateway_durations_and_addresses() {
        let config = GatewayConfig {
            host: "10.0.0.1".into(),
            ws_port: 7000,
            tcp_port: 7001,
            rpc_port: 6923,
            server_id: "connect-1".into(),
            bucket_count: default_bucket_count(),
            max_connections: default_max_connections(),
            broadcast_size: default_broadcast_size(),
            write_wait_secs: 10,
            pong_wait_secs: 60,
            ping_period_secs: 54,
            max_message_size: default_max_message_size(),
        };
        assert_eq!(config.ws_address(), "10.0.0.1:7000");
        assert_eq!(config.rpc_address(), "10.0.0.1:6923");
        assert!(config.ping_period() < config.pong_wait());
    }

    #[test]
    fn defaults_keep_ping_under_pong() {
        assert!(default_ping_period_secs() < default_pong_wait_secs());
    }

    #[test]
    fn environment_classification() {
        assert!(Environment::Production.is_production());
        assert!(!Environment::Development.is_production());
    }
}
