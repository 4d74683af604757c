//! Database layer for the storefront service.
//!
//! This module provides:
//! - Connection pool management
//! - Migration loading
//! - One store per entity (users, customers, products, orders)
//!
//! The database layer uses SQLx with Postgres.

mod customers;
mod error;
mod orders;
mod products;
mod users;

pub use customers::CustomerStore;
pub use error::DbError;
pub use orders::OrderStore;
pub use products::ProductStore;
pub use users::UserStore;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::time::Duration;
use tracing::info;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Where and as whom to connect.
    pub connect: PgConnectOptions,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            connect: connect_options("localhost", 5432, "postgres", "", "storefront"),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    ///
    /// `DATABASE_URL` wins when set; otherwise the options are assembled
    /// from `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD` and `DB_NAME`.
    pub fn from_env() -> Result<Self, DbError> {
        let connect = match std::env::var("DATABASE_URL") {
            Ok(url) => url
                .parse::<PgConnectOptions>()
                .map_err(|e| DbError::InvalidConfig {
                    name: "DATABASE_URL",
                    reason: e.to_string(),
                })?,
            Err(_) => {
                let var = |name: &str, default: &str| {
                    std::env::var(name)
                        .ok()
                        .filter(|v| !v.is_empty())
                        .unwrap_or_else(|| default.to_string())
                };
                let port = var("DB_PORT", "5432")
                    .parse::<u16>()
                    .map_err(|e| DbError::InvalidConfig {
                        name: "DB_PORT",
                        reason: e.to_string(),
                    })?;
                connect_options(
                    &var("DB_HOST", "localhost"),
                    port,
                    &var("DB_USER", "postgres"),
                    &var("DB_PASSWORD", ""),
                    &var("DB_NAME", "storefront"),
                )
            }
        };

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        Ok(Self {
            connect,
            max_connections,
            min_connections,
            ..Default::default()
        })
    }
}

/// Connection options with TLS disabled. Credentials are passed as is, so
/// reserved URL characters need no escaping.
pub fn connect_options(
    host: &str,
    port: u16,
    user: &str,
    password: &str,
    dbname: &str,
) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(host)
        .port(port)
        .username(user)
        .database(dbname)
        .ssl_mode(PgSslMode::Disable);
    if password.is_empty() {
        options
    } else {
        options.password(password)
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(config.connect.clone())
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database is reachable.
    pub async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }

    /// Run pending migrations from the first migrations directory found.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/storefront/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            if !dir.is_dir() {
                continue;
            }
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no such directory".to_string()),
        })
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerStore {
        CustomerStore::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductStore {
        ProductStore::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderStore {
        OrderStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_connect_options_from_parts() {
        let options = connect_options("localhost", 55432, "root", "secret", "testDb");
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 55432);
        assert_eq!(options.get_username(), "root");
        assert_eq!(options.get_database(), Some("testDb"));
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Disable));
    }

    #[test]
    fn test_reserved_characters_in_password_keep_host_and_database() {
        let options = connect_options("localhost", 5432, "ro@t", "p@ss/w#rd?x", "testDb");
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "ro@t");
        assert_eq!(options.get_database(), Some("testDb"));
    }

    #[test]
    fn test_database_url_still_parses() {
        let options: PgConnectOptions = "postgres://app@db:6543/shop".parse().unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("shop"));
    }
}
