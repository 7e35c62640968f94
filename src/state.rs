use std::sync::Arc;

use anyhow::Context;

use crate::auth::{OAuthRegistry, SessionManager, SessionSettings};
use crate::config::{AppConfig, StoreBackend};
use crate::database::{AuthAdapter, DatabaseManager, MemoryAdapter, PgAdapter};
use crate::services::UserService;

/// Shared handler state. Everything inside is either immutable or internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub adapter: Arc<dyn AuthAdapter>,
    pub sessions: SessionManager,
    pub oauth: Arc<OAuthRegistry>,
    pub users: UserService,
}

impl AppState {
    /// Build state for the configured store, connecting and migrating PostgreSQL when selected
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let adapter: Arc<dyn AuthAdapter> = match config.auth.store {
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database)
                    .await
                    .context("failed to connect to PostgreSQL")?;
                if config.database.run_migrations {
                    DatabaseManager::migrate(&pool)
                        .await
                        .context("failed to run migrations")?;
                }
                Arc::new(PgAdapter::new(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; all users and sessions are lost on restart");
                Arc::new(MemoryAdapter::new())
            }
        };

        let oauth = OAuthRegistry::from_config(&config.auth).context("invalid OAuth configuration")?;
        Ok(Self::assemble(config, adapter, oauth))
    }

    /// State over an existing adapter with no OAuth providers unless configured
    pub fn with_adapter(config: AppConfig, adapter: Arc<dyn AuthAdapter>) -> Self {
        let oauth = OAuthRegistry::from_config(&config.auth).unwrap_or_else(|e| {
            tracing::warn!("Ignoring OAuth configuration: {}", e);
            OAuthRegistry::default()
        });
        Self::assemble(config, adapter, oauth)
    }

    fn assemble(config: AppConfig, adapter: Arc<dyn AuthAdapter>, oauth: OAuthRegistry) -> Self {
        let sessions = SessionManager::new(adapter.clone(), SessionSettings::from_config(&config));
        Self {
            users: UserService::new(adapter.clone()),
            config: Arc::new(config),
            adapter,
            sessions,
            oauth: Arc::new(oauth),
        }
    }
}
