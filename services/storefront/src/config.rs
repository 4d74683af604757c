use std::net::SocketAddr;

use anyhow::{Context, Result};

use crate::db::DbConfig;

/// Output format for the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Apply the migrations directory on startup.
    pub migrate: bool,
    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // HTTP_PORT is what the service reads; PORT is kept for the plain server.
        let port = std::env::var("HTTP_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "8080".to_string());

        let host = std::env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let log_level =
            std::env::var("STOREFRONT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match std::env::var("STOREFRONT_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        let migrate = std::env::var("STOREFRONT_MIGRATE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let database = DbConfig::from_env().context("invalid database configuration")?;

        Ok(Self {
            listen_addr,
            log_level,
            log_format,
            migrate,
            database,
        })
    }
}
