//! Knowledge Core
//!
//! A multi-tenant knowledge base service:
//! - Ingestion: normalization, boundary-aware chunking, embedding
//! - Retrieval: tenant-scoped similarity search with thresholding
//! - Generation: grounded, citation-backed answers with degraded fallback

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use domain::DomainError;
use infrastructure::chunker::BoundaryChunker;
use infrastructure::embedding::{
    EmbeddingGateway, GatewayConfig, OpenAiEmbeddingProvider,
};
use infrastructure::generation::{AnswerGenerator, GeneratorConfig};
use infrastructure::llm::{HttpClient, OpenAiLlmProvider};
use infrastructure::normalizer::{Normalizer, NormalizerConfig};
use infrastructure::services::{KnowledgeService, ServiceDefaults};
use infrastructure::store::create_store;
use tracing::info;

/// Create the application state with all services initialized
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    info!(
        backend = %config.storage.backend,
        search_strategy = %config.storage.search_strategy,
        embedding_dimension = config.storage.embedding_dimension,
        "Initializing knowledge store"
    );

    let store = create_store(&config.storage).await?;

    let embedding_api_key = read_api_key(&config.embedding.api_key_env)?;
    let embedding_client =
        HttpClient::with_timeout(Duration::from_secs(config.embedding.timeout_secs));
    let embedding_provider = match &config.embedding.base_url {
        Some(base_url) => {
            OpenAiEmbeddingProvider::with_base_url(embedding_client, embedding_api_key, base_url)
        }
        None => OpenAiEmbeddingProvider::new(embedding_client, embedding_api_key),
    };

    let gateway_config = GatewayConfig::new(
        &config.embedding.model,
        config.storage.embedding_dimension,
    )
    .with_batch_size(config.embedding.batch_size)
    .with_max_concurrency(config.embedding.max_concurrency)
    .with_request_timeout(Duration::from_secs(config.embedding.timeout_secs))
    .with_max_retries(config.embedding.max_retries);

    let gateway = Arc::new(EmbeddingGateway::new(
        Arc::new(embedding_provider),
        gateway_config,
    ));

    let llm_api_key = read_api_key(&config.generation.api_key_env)?;
    let llm_client = HttpClient::with_timeout(Duration::from_secs(config.generation.timeout_secs));
    let llm_provider = match &config.generation.base_url {
        Some(base_url) => OpenAiLlmProvider::with_base_url(llm_client, llm_api_key, base_url),
        None => OpenAiLlmProvider::new(llm_client, llm_api_key),
    };

    let generator_config = GeneratorConfig::new(&config.generation.model)
        .with_context_token_budget(config.generation.context_token_budget)
        .with_request_timeout(Duration::from_secs(config.generation.timeout_secs));

    let generator = AnswerGenerator::new(Arc::new(llm_provider), generator_config);

    let normalizer = Normalizer::new(NormalizerConfig {
        max_content_length: config.ingestion.max_content_length,
    });

    let chunking = domain::ingestion::ChunkingConfig::new(
        config.ingestion.chunk_size,
        config.ingestion.chunk_overlap,
    )
    .with_min_chunk_size(config.ingestion.min_chunk_size);

    let defaults = ServiceDefaults {
        chunking,
        query_limit: config.ingestion.query_limit,
        similarity_threshold: config.ingestion.similarity_threshold,
        per_type_cap: config.ingestion.per_type_cap,
    };

    let service = Arc::new(KnowledgeService::new(
        store,
        gateway,
        generator,
        normalizer,
        Arc::new(BoundaryChunker::new()),
        defaults,
    ));

    info!("Knowledge service initialized");

    Ok(AppState::new(service))
}

fn read_api_key(env_var: &str) -> Result<String, DomainError> {
    std::env::var(env_var).map_err(|_| {
        DomainError::configuration(format!(
            "{} environment variable is required for provider access",
            env_var
        ))
    })
}
