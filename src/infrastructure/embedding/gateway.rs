//! Embedding gateway: batching, bounded concurrency and retry policy
//!
//! Wraps an embedding provider with the operational policy the write path
//! relies on: requests are batched up to the provider limit, run under a
//! semaphore sized to respect provider rate limits, carry explicit per-call
//! timeouts, and transient failures are retried with bounded exponential
//! backoff. Permanent failures abort immediately so no partial chunk set is
//! ever persisted downstream.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::DomainError;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Embedding model to request
    pub model: String,
    /// Fixed embedding dimension for this deployment
    pub dimension: usize,
    /// Maximum texts per provider request
    pub batch_size: usize,
    /// Maximum in-flight provider requests
    pub max_concurrency: usize,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Maximum retries for transient failures
    pub max_retries: u32,
    /// Initial backoff delay, doubled per attempt
    pub initial_backoff: Duration,
}

impl GatewayConfig {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
            batch_size: 64,
            max_concurrency: 4,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }
}

/// Embedding gateway over a provider
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    config: GatewayConfig,
    semaphore: Arc<Semaphore>,
}

impl std::fmt::Debug for EmbeddingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGateway")
            .field("provider", &self.provider.provider_name())
            .field("config", &self.config)
            .finish()
    }
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: GatewayConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));

        Self {
            provider,
            config,
            semaphore,
        }
    }

    /// The provider/model tag stamped onto every produced vector
    pub fn model_version(&self) -> String {
        format!("{}/{}", self.provider.provider_name(), self.config.model)
    }

    /// The deployment's fixed embedding dimension
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Embed a single query text
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let mut vectors = self.embed_texts(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| DomainError::internal("provider returned no embedding for query"))
    }

    /// Embed a list of texts, preserving order
    ///
    /// All batches must succeed; a single failed batch fails the whole call
    /// so the caller never persists a partially embedded chunk set.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<Vec<String>> = texts
            .chunks(self.config.batch_size)
            .map(|batch| batch.to_vec())
            .collect();

        debug!(
            batches = batches.len(),
            texts = texts.len(),
            model = %self.config.model,
            "Embedding texts"
        );

        let futures = batches
            .into_iter()
            .map(|batch| self.embed_batch_with_retry(batch));

        let mut vectors = Vec::with_capacity(texts.len());
        for batch_result in join_all(futures).await {
            vectors.extend(batch_result?);
        }

        Ok(vectors)
    }

    async fn embed_batch_with_retry(
        &self,
        batch: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, DomainError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| DomainError::internal("embedding semaphore closed"))?;

        let mut attempt: u32 = 0;

        loop {
            match self.embed_batch_once(&batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(error) if error.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.initial_backoff * 2u32.pow(attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient embedding failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn embed_batch_once(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let request = EmbeddingRequest::batch(&self.config.model, batch.to_vec());

        let response = match timeout(self.config.request_timeout, self.provider.embed(request))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(DomainError::transient(
                    self.provider.provider_name(),
                    format!(
                        "embedding request timed out after {}ms",
                        self.config.request_timeout.as_millis()
                    ),
                ));
            }
        };

        let vectors = response.into_vectors();

        if vectors.len() != batch.len() {
            return Err(DomainError::permanent(
                self.provider.provider_name(),
                format!(
                    "embedding count mismatch: requested {}, received {}",
                    batch.len(),
                    vectors.len()
                ),
            ));
        }

        for vector in &vectors {
            if vector.len() != self.config.dimension {
                return Err(DomainError::validation(format!(
                    "embedding dimension mismatch: expected {}, received {}",
                    self.config.dimension,
                    vector.len()
                )));
            }
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;

    fn fast_config(dimension: usize) -> GatewayConfig {
        GatewayConfig::new("mock-embedding", dimension)
            .with_initial_backoff(Duration::from_millis(1))
            .with_request_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_embed_preserves_order() {
        let provider = Arc::new(
            MockEmbeddingProvider::new(3)
                .with_embedding("first", vec![1.0, 0.0, 0.0])
                .with_embedding("second", vec![0.0, 1.0, 0.0]),
        );
        let gateway = EmbeddingGateway::new(provider, fast_config(3));

        let vectors = gateway
            .embed_texts(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_batching_splits_requests() {
        let provider = Arc::new(MockEmbeddingProvider::new(3));
        let gateway = EmbeddingGateway::new(
            provider.clone(),
            fast_config(3).with_batch_size(2),
        );

        let texts: Vec<String> = (0..5).map(|i| format!("text {}", i)).collect();
        let vectors = gateway.embed_texts(&texts).await.unwrap();

        assert_eq!(vectors.len(), 5);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transient_error_retried() {
        let provider = Arc::new(
            MockEmbeddingProvider::new(3)
                .with_queued_error(DomainError::transient("mock", "rate limit")),
        );
        let gateway = EmbeddingGateway::new(provider.clone(), fast_config(3));

        let vectors = gateway.embed_texts(&["hello".to_string()]).await.unwrap();

        assert_eq!(vectors.len(), 1);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let provider = Arc::new(
            MockEmbeddingProvider::new(3)
                .with_queued_error(DomainError::transient("mock", "rate limit"))
                .with_queued_error(DomainError::transient("mock", "rate limit"))
                .with_queued_error(DomainError::transient("mock", "rate limit")),
        );
        let gateway =
            EmbeddingGateway::new(provider.clone(), fast_config(3).with_max_retries(1));

        let result = gateway.embed_texts(&["hello".to_string()]).await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_fast() {
        let provider = Arc::new(
            MockEmbeddingProvider::new(3)
                .with_queued_error(DomainError::permanent("mock", "invalid credentials")),
        );
        let gateway = EmbeddingGateway::new(provider.clone(), fast_config(3));

        let result = gateway.embed_texts(&["hello".to_string()]).await;

        assert!(matches!(
            result,
            Err(DomainError::PermanentProvider { .. })
        ));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        // Provider produces 4-dimensional vectors, deployment expects 3
        let provider = Arc::new(MockEmbeddingProvider::new(4));
        let gateway = EmbeddingGateway::new(provider, fast_config(3));

        let result = gateway.embed_texts(&["hello".to_string()]).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_model_version_tag() {
        let provider = Arc::new(MockEmbeddingProvider::new(3));
        let gateway = EmbeddingGateway::new(provider, fast_config(3));

        assert_eq!(gateway.model_version(), "mock/mock-embedding");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider = Arc::new(MockEmbeddingProvider::new(3));
        let gateway = EmbeddingGateway::new(provider.clone(), fast_config(3));

        let vectors = gateway.embed_texts(&[]).await.unwrap();

        assert!(vectors.is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
