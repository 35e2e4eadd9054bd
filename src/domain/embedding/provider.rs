//! Embedding provider trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::request::EmbeddingRequest;
use super::response::EmbeddingResponse;
use crate::domain::error::DomainError;

/// Trait for embedding providers (OpenAI, compatible endpoints, ...)
///
/// Implementations classify failures: rate limits and timeouts surface as
/// `TransientProvider`, credential problems as `PermanentProvider`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate embeddings for the given request
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Default embedding model for this provider
    fn default_model(&self) -> &'static str;

    /// Known output dimension for a model, if any
    fn dimensions(&self, model: &str) -> Option<usize>;
}
