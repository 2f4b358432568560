//! Application state - shared across all handlers.

use std::sync::Arc;

use tera::Tera;

use blogicum_core::ports::{PasswordService, Repositories, TokenService};
use blogicum_core::{AccountService, BlogService};
use blogicum_infra::{Argon2PasswordService, InMemoryStore, JwtTokenService};

#[cfg(feature = "rate-limit")]
use blogicum_core::ports::RateLimiter;
#[cfg(feature = "rate-limit")]
use blogicum_infra::InMemoryRateLimiter;

use crate::config::AppConfig;

/// Failures that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Template loading failed: {0}")]
    Templates(#[from] tera::Error),

    #[cfg(feature = "postgres")]
    #[error("Migration failed: {0}")]
    Migration(#[from] migration::DbErr),
}

/// Which entity store is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    Memory,
}

impl Storage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Postgres => "postgres",
            Storage::Memory => "memory",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub blog: BlogService,
    pub accounts: AccountService,
    pub tokens: Arc<dyn TokenService>,
    pub templates: Arc<Tera>,
    pub config: Arc<AppConfig>,
    pub storage: Storage,
    #[cfg(feature = "rate-limit")]
    pub auth_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// Build the application state, connecting to PostgreSQL when configured
    /// and falling back to the in-memory store otherwise.
    pub async fn new(config: AppConfig) -> Result<Self, StartupError> {
        let templates = Tera::new(&config.templates_glob())?;
        tracing::info!(
            templates = templates.get_template_names().count(),
            "Templates loaded"
        );

        let (repos, storage) = Self::connect(&config).await?;
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::from_env());

        Ok(Self::assemble(config, repos, storage, templates, tokens))
    }

    #[cfg(feature = "postgres")]
    async fn connect(config: &AppConfig) -> Result<(Repositories, Storage), StartupError> {
        use blogicum_infra::DatabaseConnections;
        use migration::{Migrator, MigratorTrait};

        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Ok((Arc::new(InMemoryStore::new()).repositories(), Storage::Memory));
        };

        match DatabaseConnections::init(db_config).await {
            Ok(connections) => {
                if config.run_migrations {
                    Migrator::up(&connections.main, None).await?;
                    tracing::info!("Migrations applied");
                }
                Ok((connections.repositories(), Storage::Postgres))
            }
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Ok((Arc::new(InMemoryStore::new()).repositories(), Storage::Memory))
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn connect(_config: &AppConfig) -> Result<(Repositories, Storage), StartupError> {
        tracing::info!("Running without postgres feature - using in-memory store");
        Ok((Arc::new(InMemoryStore::new()).repositories(), Storage::Memory))
    }

    /// Wires services over an already chosen store.
    pub fn assemble(
        config: AppConfig,
        repos: Repositories,
        storage: Storage,
        templates: Tera,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        let accounts = AccountService::new(repos.users.clone(), passwords, tokens.clone());

        tracing::info!(storage = storage.as_str(), "Application state initialized");

        Self {
            blog: BlogService::new(repos),
            accounts,
            tokens,
            templates: Arc::new(templates),
            config: Arc::new(config),
            storage,
            #[cfg(feature = "rate-limit")]
            auth_limiter: Arc::new(InMemoryRateLimiter::from_env()),
        }
    }
}
