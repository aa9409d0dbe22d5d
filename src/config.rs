//! Environment configuration for the commission service.

use std::env;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("COMMISSION_PORT must be a valid u16")]
    InvalidPort,
    #[error("COMMISSION_HOST is not a valid IP address: {source}")]
    InvalidHost {
        #[source]
        source: AddrParseError,
    },
}

/// Top-level configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON file holding the [`crate::settings::CommissionSettings`]
    /// snapshot loaded at startup.
    pub settings_path: PathBuf,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Reads configuration from the environment, after loading a `.env`
    /// file if one is present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let settings_path = lookup("COMMISSION_SETTINGS_PATH")
            .unwrap_or_else(|| "commission_settings.json".to_string());
        let host = lookup("COMMISSION_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("COMMISSION_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let log_level = lookup("COMMISSION_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            settings_path: PathBuf::from(settings_path),
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub log_level: String,
}
