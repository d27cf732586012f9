use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;
use crate::storage::{S3Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let storage = Arc::new(S3Storage::from_config(&config).await?) as Arc<dyn StorageClient>;

        Ok(Self {
            db,
            config,
            storage,
        })
    }

    /// State with a pool that never connects unless queried. Must be built inside a
    /// tokio runtime.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig::for_tests());
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");
        let storage =
            Arc::new(crate::storage::MemoryStorage::default()) as Arc<dyn StorageClient>;
        Self {
            db,
            config,
            storage,
        }
    }
}
