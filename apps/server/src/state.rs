//! Shared application state

use crate::{
    auth::AuthManager,
    config::{Config, StoreBackend},
    db::{InMemoryStore, PostgresStore, Store},
    realtime::RealtimeHub,
    services::{
        AuditService, AuthService, FormService, HealthService, PatientService, UserService,
        VisitService,
    },
    Result,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppStateOptions {
    pub run_migrations: bool,
    /// Create the configured bootstrap administrator if it is missing.
    pub bootstrap_admin: bool,
    pub store: StoreBackend,
}

impl AppStateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            run_migrations: config.database.run_migrations,
            bootstrap_admin: true,
            store: config.database.backend,
        }
    }
}

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthManager>,
    pub store: Arc<dyn Store>,
    pub realtime: Arc<RealtimeHub>,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub patient_service: Arc<PatientService>,
    pub visit_service: Arc<VisitService>,
    pub form_service: Arc<FormService>,
    pub audit_service: Arc<AuditService>,
    pub health_service: Arc<HealthService>,
}

impl AppState {
    /// Initialize the application state
    pub async fn new(config: Config) -> Result<Self> {
        let options = AppStateOptions::from_config(&config);
        Self::new_with_options(config, options).await
    }

    pub async fn new_with_options(config: Config, options: AppStateOptions) -> Result<Self> {
        tracing::info!(backend = ?options.store, "Initializing application state...");

        let store: Arc<dyn Store> = match options.store {
            StoreBackend::Postgres => {
                let db_pool = create_db_pool(&config).await?;
                if options.run_migrations {
                    tracing::info!("Running database migrations...");
                    sqlx::migrate!("./migrations")
                        .run(&db_pool)
                        .await
                        .map_err(|e| crate::Error::Internal(format!("Migration failed: {}", e)))?;
                }
                Arc::new(PostgresStore::new(db_pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };

        let state = Self::with_store(config, store);

        if options.bootstrap_admin {
            crate::startup::ensure_bootstrap_admin(&state.config, state.store.as_ref()).await?;
        }

        tracing::info!("Application state initialized successfully");
        Ok(state)
    }

    /// Wires services around an already constructed store.
    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Self {
        let config = Arc::new(config);
        let auth = Arc::new(AuthManager::new(config.clone()));
        let realtime = Arc::new(RealtimeHub::new(&config.realtime));
        let pagination = config.pagination.clone();

        Self {
            auth_service: Arc::new(AuthService::new(store.clone(), auth.clone())),
            user_service: Arc::new(UserService::new(
                store.clone(),
                auth.clone(),
                realtime.clone(),
                pagination.clone(),
            )),
            patient_service: Arc::new(PatientService::new(
                store.clone(),
                realtime.clone(),
                pagination.clone(),
            )),
            visit_service: Arc::new(VisitService::new(
                store.clone(),
                realtime.clone(),
                pagination.clone(),
            )),
            form_service: Arc::new(FormService::new(
                store.clone(),
                realtime.clone(),
                pagination.clone(),
                config.workflow.clone(),
            )),
            audit_service: Arc::new(AuditService::new(store.clone(), pagination)),
            health_service: Arc::new(HealthService::new(store.clone(), realtime.clone())),
            config,
            auth,
            store,
            realtime,
        }
    }
}

async fn create_db_pool(config: &Config) -> Result<PgPool> {
    tracing::info!("Creating database connection pool...");

    let statement_timeout = config.database.statement_timeout_seconds;
    let lock_timeout = config.database.lock_timeout_seconds;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(config.database.pool_min_size)
        .max_connections(config.database.pool_max_size)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database.pool_timeout_seconds,
        ))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                // Per-session limits so a stuck query cannot hold a connection forever.
                sqlx::query(&format!("SET statement_timeout = '{}s'", statement_timeout))
                    .execute(&mut *conn)
                    .await?;
                sqlx::query(&format!("SET lock_timeout = '{}s'", lock_timeout))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database.url)
        .await
        .map_err(crate::Error::Database)?;

    tracing::info!(
        "Database pool created (min: {}, max: {})",
        config.database.pool_min_size,
        config.database.pool_max_size
    );

    Ok(pool)
}
