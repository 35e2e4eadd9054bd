//! Knowledge store factory

use std::str::FromStr;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::domain::knowledge::KnowledgeStore;
use crate::domain::DomainError;

use super::in_memory::InMemoryKnowledgeStore;
use super::postgres::{PgKnowledgeStore, PgStoreConfig, SearchStrategy};

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_memory" => Ok(Self::InMemory),
            "postgres" => Ok(Self::Postgres),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Build a knowledge store from configuration
///
/// The Postgres backend connects via the `DATABASE_URL` environment
/// variable; the in-memory backend needs no external services and is meant
/// for development and tests.
pub async fn create_store(config: &StorageConfig) -> Result<Arc<dyn KnowledgeStore>, DomainError> {
    let backend = StorageBackend::from_str(&config.backend)
        .map_err(DomainError::configuration)?;

    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryKnowledgeStore::new(
            config.embedding_dimension,
        ))),
        StorageBackend::Postgres => {
            let database_url = std::env::var("DATABASE_URL").map_err(|_| {
                DomainError::configuration(
                    "DATABASE_URL environment variable is required for the postgres backend",
                )
            })?;

            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to connect: {}", e)))?;

            let strategy = SearchStrategy::from_str(&config.search_strategy)
                .map_err(DomainError::configuration)?;

            let store_config = PgStoreConfig::new(config.embedding_dimension)
                .with_strategy(strategy)
                .with_linear_scan_limit(config.linear_scan_limit);

            let store = PgKnowledgeStore::new(pool, store_config);

            if config.ensure_schema {
                store.ensure_schema().await?;
            }

            Ok(Arc::new(store))
        }
    }
}
