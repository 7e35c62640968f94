use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl DatabaseError {
    /// Map unique-constraint violations to `Conflict`, everything else passes through
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DatabaseError::Conflict(format!("{} already exists", what))
            }
            _ => DatabaseError::Sqlx(err),
        }
    }
}

/// Connection pool setup and schema management for PostgreSQL
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a pool against `config.url`
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        Self::validate_url(url)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Created database pool (max_connections={})",
            config.max_connections
        );
        Ok(pool)
    }

    /// Apply pending migrations from ./migrations
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    fn validate_url(url: &str) -> Result<(), DatabaseError> {
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        match parsed.scheme() {
            "postgres" | "postgresql" => {}
            _ => return Err(DatabaseError::InvalidDatabaseUrl),
        }
        if parsed.path().trim_start_matches('/').is_empty() {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        Ok(())
    }
}
