//! Environment-driven server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Deployment environment, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub environment: Environment,
    /// When set, the Postgres store is used; otherwise the in-memory store.
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Load from `HOST`, `PORT`, `APP_ENV` and `DATABASE_URL`, with
    /// development defaults.
    pub fn from_env() -> eyre::Result<Self> {
        let host = match std::env::var("HOST") {
            Ok(value) => value
                .parse()
                .map_err(|e| eyre::eyre!("Invalid HOST '{}': {}", value, e))?,
            Err(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match std::env::var("PORT") {
            Ok(value) => value
                .parse()
                .map_err(|e| eyre::eyre!("Invalid PORT '{}': {}", value, e))?,
            Err(_) => 3000,
        };

        Ok(Self {
            host,
            port,
            environment: Environment::from_env(),
            database_url: std::env::var("DATABASE_URL").ok(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            environment: Environment::Development,
            database_url: None,
        };

        assert_eq!(config.addr().to_string(), "0.0.0.0:3000");
        assert!(!config.environment.is_production());
    }
}
