use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub status_interval_seconds: u64,
    pub allow_anonymous: bool,
    pub evict_empty_rooms: bool,
    pub max_payload_bytes: usize,
    pub log_format: LogFormat,
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            status_interval_seconds: 60,
            allow_anonymous: false,
            evict_empty_rooms: false,
            max_payload_bytes: 1024 * 1024,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let status_interval_seconds = match lookup("STATUS_INTERVAL_SECONDS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidInterval)?,
            None => defaults.status_interval_seconds,
        };
        if status_interval_seconds == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        Ok(Config {
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            status_interval_seconds,
            allow_anonymous: lookup("ALLOW_ANONYMOUS")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.allow_anonymous),
            evict_empty_rooms: lookup("EVICT_EMPTY_ROOMS")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.evict_empty_rooms),
            max_payload_bytes: match lookup("MAX_PAYLOAD_BYTES") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPayloadLimit)?,
                None => defaults.max_payload_bytes,
            },
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_seconds)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port")]
    InvalidPort,
    #[error("STATUS_INTERVAL_SECONDS must be a positive integer")]
    InvalidInterval,
    #[error("MAX_PAYLOAD_BYTES must be a non-negative integer")]
    InvalidPayloadLimit,
}
