//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::util::rate_limit::INPUT_RATE_LIMIT;
use crate::util::time::STATE_SYNC_INTERVAL_MS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Secret used to verify HS256 session credentials
    pub jwt_secret: String,
    /// Jet catalog JSON file; the built-in catalog is used when unset
    pub jets_path: Option<PathBuf>,

    /// WebSocket endpoint path
    pub ws_path: String,
    /// Cadence of the shared `state:sync` ticker
    pub sync_interval: Duration,
    /// Close connections that send nothing for this long (`None` disables)
    pub idle_timeout: Option<Duration>,
    /// Inbound messages allowed per connection per second
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string())
        };

        let ws_path = env::var("WS_PATH").unwrap_or_else(|_| "/ws/".to_string());
        if !ws_path.starts_with('/') {
            return Err(ConfigError::Invalid("WS_PATH"));
        }

        let idle_secs: u64 = parse_or("IDLE_TIMEOUT_SECS", 60)?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            jets_path: env::var("JETS_PATH").ok().map(PathBuf::from),

            ws_path,
            sync_interval: Duration::from_millis(
                parse_or("STATE_SYNC_INTERVAL_MS", STATE_SYNC_INTERVAL_MS)?.max(1),
            ),
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            input_rate_limit: parse_or("INPUT_RATE_LIMIT", INPUT_RATE_LIMIT)?,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
