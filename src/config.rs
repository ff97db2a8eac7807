use std::{env, fmt, net::SocketAddr, str::FromStr, time::Duration};

use thiserror::Error;

pub const DEFAULT_AMAP_BASE_URL: &str = "https://restapi.amap.com";
pub const DEFAULT_NWS_BASE_URL: &str = "https://api.weather.gov";
pub const DEFAULT_USER_AGENT: &str = "weather-app/1.0";

/// How `/connect` keeps (or does not keep) per-client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stateful,
    Stateless,
}

impl TransportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stateful => "stateful",
            Self::Stateless => "stateless",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stateful" | "sse" => Ok(Self::Stateful),
            "stateless" | "http" => Ok(Self::Stateless),
            _ => Err(ConfigError::InvalidTransport),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub amap_api_key: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub transport: TransportMode,
    pub keep_alive: Duration,
    pub api_token: Option<String>,
    pub amap_base_url: String,
    pub nws_base_url: String,
    pub user_agent: String,
    pub upstream_timeout: Duration,
    pub weather_fallback: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("AMAP_API_KEY or AMAP_MAPS_API_KEY environment variable is not set")]
    MissingApiKey,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_TRANSPORT must be one of: stateful, stateless")]
    InvalidTransport,
    #[error("{0} must be a positive number of seconds")]
    InvalidSeconds(&'static str),
    #[error("WEATHER_FALLBACK must be a boolean")]
    InvalidFallbackFlag,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let amap_api_key = non_empty("AMAP_API_KEY")
            .or_else(|| non_empty("AMAP_MAPS_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = non_empty("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(3001);
        let transport = non_empty("MCP_TRANSPORT")
            .map(|value| value.parse::<TransportMode>())
            .transpose()?
            .unwrap_or(TransportMode::Stateless);
        let keep_alive = parse_seconds(non_empty("MCP_KEEPALIVE_SECS"), "MCP_KEEPALIVE_SECS", 30)?;
        let upstream_timeout =
            parse_seconds(non_empty("UPSTREAM_TIMEOUT_SECS"), "UPSTREAM_TIMEOUT_SECS", 10)?;
        let weather_fallback = match non_empty("WEATHER_FALLBACK")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("false") | Some("0") | Some("no") => false,
            Some("true") | Some("1") | Some("yes") => true,
            Some(_) => return Err(ConfigError::InvalidFallbackFlag),
        };

        let config = Self {
            amap_api_key,
            bind_addr,
            bind_port,
            transport,
            keep_alive,
            api_token: non_empty("MCP_API_TOKEN"),
            amap_base_url: non_empty("AMAP_BASE_URL")
                .unwrap_or_else(|| DEFAULT_AMAP_BASE_URL.to_string()),
            nws_base_url: non_empty("NWS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_NWS_BASE_URL.to_string()),
            user_agent: non_empty("UPSTREAM_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            upstream_timeout,
            weather_fallback,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

fn parse_seconds(
    value: Option<String>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let seconds = value
        .map(|value| value.parse::<u64>().map_err(|_| ConfigError::InvalidSeconds(name)))
        .transpose()?
        .unwrap_or(default);

    if seconds == 0 {
        return Err(ConfigError::InvalidSeconds(name));
    }

    Ok(Duration::from_secs(seconds))
}
