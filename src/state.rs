use crate::config::AppConfig;
use crate::storage::{self, MemoryStorage, StorageClient};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let storage = storage::from_config(&config.storage).await?;

        Ok(Self {
            db,
            config,
            storage,
        })
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        Self {
            db,
            config,
            storage,
        }
    }

    /// State with a lazily connecting pool and in-memory storage; the pool
    /// only fails once a query is actually run.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig::for_tests());

        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");

        let storage = Arc::new(MemoryStorage::default()) as Arc<dyn StorageClient>;
        Self {
            db,
            config,
            storage,
        }
    }
}
