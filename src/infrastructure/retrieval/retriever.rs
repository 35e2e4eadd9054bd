//! Retriever: query embedding, similarity search, thresholding and
//! source-type diversity

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::domain::knowledge::{KnowledgeStore, RetrievalResult, SearchFilter, SourceType};
use crate::domain::retrieval::{QueryContext, RetrievalOutcome};
use crate::domain::DomainError;
use crate::infrastructure::embedding::EmbeddingGateway;

/// Turns a query into a ranked, thresholded set of relevant chunks
///
/// Agnostic to which search strategy the store runs; an empty result set is
/// a valid outcome, never an error.
pub struct Retriever {
    gateway: Arc<EmbeddingGateway>,
    store: Arc<dyn KnowledgeStore>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever").finish()
    }
}

impl Retriever {
    pub fn new(gateway: Arc<EmbeddingGateway>, store: Arc<dyn KnowledgeStore>) -> Self {
        Self { gateway, store }
    }

    /// Retrieve chunks relevant to the query
    pub async fn retrieve(&self, ctx: &QueryContext) -> Result<RetrievalOutcome, DomainError> {
        ctx.validate()?;

        let started = Instant::now();

        let query_embedding = self.gateway.embed_query(&ctx.query).await?;

        let filter = SearchFilter::new().with_source_types(ctx.source_types.clone());

        // Overfetch when a diversity cap is active so capped-out slots can
        // be refilled from lower-ranked types.
        let fetch_limit = match ctx.per_type_cap {
            Some(_) => ctx.limit.saturating_mul(4),
            None => ctx.limit,
        };

        let mut results = self
            .store
            .similarity_search(&ctx.tenant_id, &query_embedding, filter, fetch_limit)
            .await?;

        let before_threshold = results.len();
        results.retain(|result| result.similarity >= ctx.similarity_threshold);

        debug!(
            tenant_id = %ctx.tenant_id,
            retrieved = before_threshold,
            above_threshold = results.len(),
            threshold = ctx.similarity_threshold,
            "Similarity search complete"
        );

        let mut results = match ctx.per_type_cap {
            Some(cap) => apply_diversity_cap(results, cap, ctx.limit),
            None => results,
        };
        results.truncate(ctx.limit);

        Ok(RetrievalOutcome::new(
            results,
            started.elapsed().as_millis() as u64,
        ))
    }
}

/// Cap results per source type, refilling leftover slots in rank order
///
/// Only applies when more than one source type is present; with a single
/// type the cap would just starve the result list.
fn apply_diversity_cap(
    results: Vec<RetrievalResult>,
    cap: usize,
    limit: usize,
) -> Vec<RetrievalResult> {
    let distinct_types = {
        let mut types: Vec<SourceType> = results.iter().map(|r| r.source_type).collect();
        types.sort_by_key(|t| t.as_str());
        types.dedup();
        types.len()
    };

    if distinct_types <= 1 {
        return results;
    }

    let mut counts: std::collections::HashMap<SourceType, usize> =
        std::collections::HashMap::new();
    let mut kept: Vec<RetrievalResult> = Vec::new();
    let mut skipped: Vec<RetrievalResult> = Vec::new();

    for result in results {
        let count = counts.entry(result.source_type).or_insert(0);
        if *count < cap {
            *count += 1;
            kept.push(result);
        } else {
            skipped.push(result);
        }
    }

    // Refill remaining slots from the skipped tail, preserving rank order
    for result in skipped {
        if kept.len() >= limit {
            break;
        }
        kept.push(result);
    }

    kept.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.knowledge_base_id.cmp(&b.knowledge_base_id))
            .then(a.chunk_index.cmp(&b.chunk_index))
    });

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::knowledge::{MockKnowledgeStore, TenantId};
    use crate::infrastructure::embedding::GatewayConfig;
    use uuid::Uuid;

    fn gateway() -> Arc<EmbeddingGateway> {
        Arc::new(EmbeddingGateway::new(
            Arc::new(MockEmbeddingProvider::new(3)),
            GatewayConfig::new("mock-embedding", 3),
        ))
    }

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    fn result(similarity: f32, source_type: SourceType, title: &str) -> RetrievalResult {
        RetrievalResult::new(Uuid::new_v4(), Uuid::new_v4(), "content", similarity)
            .with_provenance(title, source_type)
    }

    #[tokio::test]
    async fn test_threshold_filters_results() {
        let store = Arc::new(MockKnowledgeStore::new().with_search_results(vec![
            result(0.9, SourceType::Manual, "High"),
            result(0.6, SourceType::Manual, "Mid"),
            result(0.3, SourceType::Manual, "Low"),
        ]));
        let retriever = Retriever::new(gateway(), store);

        let ctx = QueryContext::new(tenant(), "pump").with_similarity_threshold(0.5);
        let outcome = retriever.retrieve(&ctx).await.unwrap();

        assert_eq!(outcome.chunks.len(), 2);
        assert!(outcome.chunks.iter().all(|c| c.similarity >= 0.5));
    }

    #[tokio::test]
    async fn test_threshold_above_max_returns_empty() {
        let store = Arc::new(MockKnowledgeStore::new().with_search_results(vec![
            result(0.9, SourceType::Manual, "High"),
        ]));
        let retriever = Retriever::new(gateway(), store);

        let ctx = QueryContext::new(tenant(), "pump").with_similarity_threshold(1.0);
        let outcome = retriever.retrieve(&ctx).await.unwrap();

        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_is_valid_outcome() {
        let store = Arc::new(MockKnowledgeStore::new());
        let retriever = Retriever::new(gateway(), store);

        let ctx = QueryContext::new(tenant(), "anything");
        let outcome = retriever.retrieve(&ctx).await.unwrap();

        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_context_rejected() {
        let store = Arc::new(MockKnowledgeStore::new());
        let retriever = Retriever::new(gateway(), store);

        let ctx = QueryContext::new(tenant(), "pump").with_similarity_threshold(2.0);

        assert!(matches!(
            retriever.retrieve(&ctx).await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_diversity_cap_limits_dominant_type() {
        let store = Arc::new(MockKnowledgeStore::new().with_search_results(vec![
            result(0.95, SourceType::Product, "P1"),
            result(0.94, SourceType::Product, "P2"),
            result(0.93, SourceType::Product, "P3"),
            result(0.92, SourceType::Product, "P4"),
            result(0.80, SourceType::Manual, "M1"),
            result(0.75, SourceType::Document, "D1"),
        ]));
        let retriever = Retriever::new(gateway(), store);

        let ctx = QueryContext::new(tenant(), "pump")
            .with_limit(4)
            .with_similarity_threshold(0.1)
            .with_per_type_cap(2);
        let outcome = retriever.retrieve(&ctx).await.unwrap();

        assert_eq!(outcome.chunks.len(), 4);

        let product_count = outcome
            .chunks
            .iter()
            .filter(|c| c.source_type == SourceType::Product)
            .count();
        assert_eq!(product_count, 2);
        assert!(outcome
            .chunks
            .iter()
            .any(|c| c.source_type == SourceType::Manual));
        assert!(outcome
            .chunks
            .iter()
            .any(|c| c.source_type == SourceType::Document));
    }

    #[tokio::test]
    async fn test_diversity_cap_ignored_for_single_type() {
        let store = Arc::new(MockKnowledgeStore::new().with_search_results(vec![
            result(0.95, SourceType::Product, "P1"),
            result(0.94, SourceType::Product, "P2"),
            result(0.93, SourceType::Product, "P3"),
        ]));
        let retriever = Retriever::new(gateway(), store);

        let ctx = QueryContext::new(tenant(), "pump")
            .with_limit(3)
            .with_similarity_threshold(0.1)
            .with_per_type_cap(1);
        let outcome = retriever.retrieve(&ctx).await.unwrap();

        // A single-type result set is not starved down to the cap
        assert_eq!(outcome.chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_results_stay_ranked() {
        let store = Arc::new(MockKnowledgeStore::new().with_search_results(vec![
            result(0.9, SourceType::Manual, "A"),
            result(0.8, SourceType::Document, "B"),
            result(0.7, SourceType::Manual, "C"),
        ]));
        let retriever = Retriever::new(gateway(), store);

        let ctx = QueryContext::new(tenant(), "pump").with_similarity_threshold(0.0);
        let outcome = retriever.retrieve(&ctx).await.unwrap();

        let similarities: Vec<f32> = outcome.chunks.iter().map(|c| c.similarity).collect();
        let mut sorted = similarities.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(similarities, sorted);
    }
}
