//! Server configuration.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use orderline_core::ConfigError;

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Which `OrderStore` backs the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    #[default]
    Postgres,
    /// Process-local store; contents are lost on exit.
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Postgres => "postgres",
            StoreKind::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" => Ok(StoreKind::Memory),
            other => Err(ConfigError::InvalidValue {
                field: "ORDERLINE_STORE".to_string(),
                value: other.to_string(),
                reason: "expected postgres or memory".to_string(),
            }),
        }
    }
}

/// HTTP listener and store selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub store: StoreKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            store: StoreKind::default(),
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ORDERLINE_API_BIND`: Listen host (default: 0.0.0.0)
    /// - `PORT` or `ORDERLINE_API_PORT`: Listen port (default: 8080)
    /// - `ORDERLINE_STORE`: `postgres` or `memory` (default: postgres)
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an unparsable port or an
    /// unknown store kind.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_host =
            std::env::var("ORDERLINE_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("ORDERLINE_API_PORT").ok())
        {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                field: "ORDERLINE_API_PORT".to_string(),
                value,
                reason: "expected a port number".to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let store = match std::env::var("ORDERLINE_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreKind::default(),
        };

        Ok(Self {
            bind_host,
            port,
            store,
        })
    }

    pub fn with_store(mut self, store: StoreKind) -> Self {
        self.store = store;
        self
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "ORDERLINE_API_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_parse() {
        assert_eq!("postgres".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert_eq!(" Memory ".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!(matches!(
            "redis".parse::<StoreKind>(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr().unwrap().port(), 8080);

        let bad = ServerConfig {
            bind_host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad.bind_addr().is_err());
    }
}
