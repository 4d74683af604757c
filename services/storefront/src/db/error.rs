//! Database error types.

use thiserror::Error;

/// SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}. Run from repo root or services/storefront.")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// A connection setting from the environment could not be used.
    #[error("invalid {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    /// The addressed row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A referenced row is missing, or a row is still referenced.
    #[error("foreign key violation on {constraint}")]
    ForeignKey {
        constraint: String,
        #[source]
        source: sqlx::Error,
    },
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classify a query failure, pulling foreign key violations out of the
    /// generic `Query` bucket.
    pub fn from_query(err: sqlx::Error) -> Self {
        let constraint = err
            .as_database_error()
            .filter(|db| db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION))
            .map(|db| db.constraint().unwrap_or("unknown").to_string());

        match constraint {
            Some(constraint) => Self::ForeignKey {
                constraint,
                source: err,
            },
            None => Self::Query(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}
