//! Knowledge service - the ingest/query/generate/delete/stats contract
//!
//! Write path: normalize -> chunk -> embed -> transactional upsert. All
//! embeddings are obtained before anything is persisted, so a provider
//! failure can never leave a partial chunk set behind; the store transaction
//! covers the rest. Read path: embed query -> similarity search -> threshold
//! and diversity -> optional grounded generation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::ingestion::{
    BatchIngestionReport, BatchItemOutcome, ChunkingConfig, ChunkingStrategy, IngestOptions,
    IngestionReceipt,
};
use crate::domain::knowledge::{
    validation::validate_source_id, EntryFilter, EntrySummary, KnowledgeBaseEntry, KnowledgeStore,
    SourceContent, SourceType, StoredChunk, TenantId, TenantStats,
};
use crate::domain::retrieval::{QueryContext, RetrievalOutcome};
use crate::domain::DomainError;
use crate::domain::GenerationResult;
use crate::infrastructure::embedding::EmbeddingGateway;
use crate::infrastructure::generation::AnswerGenerator;
use crate::infrastructure::normalizer::Normalizer;
use crate::infrastructure::retrieval::Retriever;

/// Request to ingest one source into the knowledge base
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub title: String,
    pub source_id: String,
    pub content: SourceContent,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl IngestRequest {
    pub fn new(
        title: impl Into<String>,
        source_id: impl Into<String>,
        content: SourceContent,
    ) -> Self {
        Self {
            title: title.into(),
            source_id: source_id.into(),
            content,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Query request parameters
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    pub source_types: Vec<SourceType>,
    pub limit: Option<usize>,
    pub similarity_threshold: Option<f32>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_source_types(mut self, source_types: Vec<SourceType>) -> Self {
        self.source_types = source_types;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }
}

/// Generation request parameters
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub query: String,
    pub user_id: Option<String>,
    pub intent: Option<String>,
    pub source_types: Vec<SourceType>,
}

impl GenerateRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_source_types(mut self, source_types: Vec<SourceType>) -> Self {
        self.source_types = source_types;
        self
    }
}

/// Service-level retrieval defaults, normally loaded from configuration
#[derive(Debug, Clone)]
pub struct ServiceDefaults {
    pub chunking: ChunkingConfig,
    pub query_limit: usize,
    pub similarity_threshold: f32,
    pub per_type_cap: Option<usize>,
}

impl Default for ServiceDefaults {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            query_limit: 10,
            similarity_threshold: 0.5,
            per_type_cap: Some(5),
        }
    }
}

/// The core knowledge service
pub struct KnowledgeService {
    store: Arc<dyn KnowledgeStore>,
    gateway: Arc<EmbeddingGateway>,
    retriever: Retriever,
    generator: AnswerGenerator,
    normalizer: Normalizer,
    chunker: Arc<dyn ChunkingStrategy>,
    defaults: ServiceDefaults,
}

impl std::fmt::Debug for KnowledgeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeService")
            .field("chunker", &self.chunker.name())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl KnowledgeService {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        gateway: Arc<EmbeddingGateway>,
        generator: AnswerGenerator,
        normalizer: Normalizer,
        chunker: Arc<dyn ChunkingStrategy>,
        defaults: ServiceDefaults,
    ) -> Self {
        let retriever = Retriever::new(gateway.clone(), store.clone());

        Self {
            store,
            gateway,
            retriever,
            generator,
            normalizer,
            chunker,
            defaults,
        }
    }

    /// Ingest one source: normalize, chunk, embed, persist atomically
    #[instrument(skip(self, request, options), fields(tenant_id = %tenant_id, source_id = %request.source_id))]
    pub async fn ingest(
        &self,
        tenant_id: &TenantId,
        request: IngestRequest,
        options: IngestOptions,
    ) -> Result<IngestionReceipt, DomainError> {
        validate_source_id(&request.source_id)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if request.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }

        let source_type = request.content.source_type();
        let normalized = self.normalizer.normalize(&request.content)?;

        let mut chunking = self.defaults.chunking.clone();
        if let Some(chunk_size) = options.chunk_size {
            chunking.chunk_size = chunk_size;
        }
        if let Some(chunk_overlap) = options.chunk_overlap {
            chunking.chunk_overlap = chunk_overlap;
        }

        let chunks = self.chunker.chunk(&normalized.text, &chunking)?;

        if chunks.is_empty() {
            return Err(DomainError::validation(
                "content produced no chunks after normalization",
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.gateway.embed_texts(&texts).await?;
        let model_version = self.gateway.model_version();

        let mut metadata = request.metadata;
        for (key, value) in normalized.metadata {
            metadata.insert(key, value);
        }

        let entry = KnowledgeBaseEntry::new(
            tenant_id.clone(),
            source_type,
            request.source_id,
            request.title,
            normalized.text,
        )
        .with_metadata(metadata);

        let tokens_processed: usize = chunks.iter().map(|c| c.token_count()).sum();

        let stored_chunks: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                StoredChunk::new(
                    entry.id(),
                    tenant_id.clone(),
                    chunk.metadata.chunk_index as i32,
                    chunk.content,
                )
                .with_embedding(embedding)
                .with_token_count(chunk.metadata.token_count as i32)
                .with_model_version(&model_version)
            })
            .collect();

        let chunks_created = stored_chunks.len();
        let knowledge_base_id = self.store.upsert(entry, stored_chunks).await?;

        info!(
            knowledge_base_id = %knowledge_base_id,
            chunks_created,
            tokens_processed,
            source_type = %source_type,
            "Ingestion complete"
        );

        Ok(IngestionReceipt {
            knowledge_base_id,
            chunks_created,
            tokens_processed,
        })
    }

    /// Ingest a batch of sources; one bad record never aborts the batch
    pub async fn ingest_batch(
        &self,
        tenant_id: &TenantId,
        requests: Vec<IngestRequest>,
        options: IngestOptions,
    ) -> Result<BatchIngestionReport, DomainError> {
        let mut report = BatchIngestionReport::new();

        for request in requests {
            let source_id = request.source_id.clone();

            match self.ingest(tenant_id, request, options.clone()).await {
                Ok(receipt) => report.add(BatchItemOutcome::succeeded(source_id, receipt)),
                Err(error) => {
                    info!(
                        tenant_id = %tenant_id,
                        source_id = %source_id,
                        error = %error,
                        "Batch item failed"
                    );
                    report.add(BatchItemOutcome::failed(source_id, error.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Retrieve chunks relevant to a query
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id))]
    pub async fn query(
        &self,
        tenant_id: &TenantId,
        request: QueryRequest,
    ) -> Result<RetrievalOutcome, DomainError> {
        let ctx = self.query_context(tenant_id, &request.query, request.source_types);

        let ctx = match request.limit {
            Some(limit) => ctx.with_limit(limit),
            None => ctx,
        };
        let ctx = match request.similarity_threshold {
            Some(threshold) => ctx.with_similarity_threshold(threshold),
            None => ctx,
        };

        self.retriever.retrieve(&ctx).await
    }

    /// Generate a grounded, citation-backed answer
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, user_id = request.user_id.as_deref(), intent = request.intent.as_deref()))]
    pub async fn generate(
        &self,
        tenant_id: &TenantId,
        request: GenerateRequest,
    ) -> Result<GenerationResult, DomainError> {
        let started = std::time::Instant::now();

        let ctx = self.query_context(tenant_id, &request.query, request.source_types);
        let outcome = self.retriever.retrieve(&ctx).await?;

        let result = self
            .generator
            .generate(&request.query, &outcome.chunks)
            .await?;

        Ok(result.with_processing_time(started.elapsed().as_millis() as u64))
    }

    /// Delete an entry and its chunks; false when the entry is absent
    pub async fn delete(&self, tenant_id: &TenantId, entry_id: Uuid) -> Result<bool, DomainError> {
        let deleted = self.store.delete(tenant_id, entry_id).await?;

        info!(
            tenant_id = %tenant_id,
            entry_id = %entry_id,
            deleted,
            "Delete processed"
        );

        Ok(deleted)
    }

    /// Metadata-only entry listing
    pub async fn list_entries(
        &self,
        tenant_id: &TenantId,
        filter: EntryFilter,
    ) -> Result<Vec<EntrySummary>, DomainError> {
        self.store.list_entries(tenant_id, filter).await
    }

    /// Per-tenant statistics
    pub async fn stats(&self, tenant_id: &TenantId) -> Result<TenantStats, DomainError> {
        self.store.stats(tenant_id).await
    }

    /// Storage reachability, for readiness probes
    pub async fn health_check(&self) -> Result<bool, DomainError> {
        self.store.health_check().await
    }

    fn query_context(
        &self,
        tenant_id: &TenantId,
        query: &str,
        source_types: Vec<SourceType>,
    ) -> QueryContext {
        let mut ctx = QueryContext::new(tenant_id.clone(), query)
            .with_source_types(source_types)
            .with_limit(self.defaults.query_limit)
            .with_similarity_threshold(self.defaults.similarity_threshold);

        if let Some(cap) = self.defaults.per_type_cap {
            ctx = ctx.with_per_type_cap(cap);
        }

        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::{
        Embedding, EmbeddingInput, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
        EmbeddingUsage,
    };
    use crate::domain::generation::MockLlmProvider;
    use crate::infrastructure::chunker::BoundaryChunker;
    use crate::infrastructure::embedding::GatewayConfig;
    use crate::infrastructure::generation::GeneratorConfig;
    use crate::infrastructure::normalizer::NormalizerConfig;
    use crate::infrastructure::store::InMemoryKnowledgeStore;
    use async_trait::async_trait;

    /// Test embedder projecting text onto a fixed keyword vocabulary, so
    /// similarity reflects term overlap deterministically
    #[derive(Debug)]
    struct KeywordEmbeddingProvider;

    const VOCABULARY: &[&str] = &["pump", "flow", "rate", "300", "pressure", "bar"];

    impl KeywordEmbeddingProvider {
        fn vector_for(text: &str) -> Vec<f32> {
            let lowered = text.to_lowercase();
            let tokens: Vec<&str> = lowered
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|t| !t.is_empty())
                .collect();

            VOCABULARY
                .iter()
                .map(|term| tokens.iter().filter(|t| *t == term).count() as f32)
                .collect()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbeddingProvider {
        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, DomainError> {
            let texts: Vec<String> = match request.input() {
                EmbeddingInput::Single(text) => vec![text.clone()],
                EmbeddingInput::Batch(texts) => texts.clone(),
            };

            let embeddings = texts
                .iter()
                .enumerate()
                .map(|(i, text)| Embedding::new(i, Self::vector_for(text)))
                .collect();

            Ok(EmbeddingResponse::new(
                request.model(),
                embeddings,
                EmbeddingUsage::default(),
            ))
        }

        fn provider_name(&self) -> &'static str {
            "keyword"
        }

        fn default_model(&self) -> &'static str {
            "keyword-tf"
        }

        fn dimensions(&self, _model: &str) -> Option<usize> {
            Some(VOCABULARY.len())
        }
    }

    fn build_service(llm: Arc<MockLlmProvider>) -> Arc<KnowledgeService> {
        let dimension = VOCABULARY.len();
        let store = Arc::new(InMemoryKnowledgeStore::new(dimension));
        let gateway = Arc::new(EmbeddingGateway::new(
            Arc::new(KeywordEmbeddingProvider),
            GatewayConfig::new("keyword-tf", dimension),
        ));
        let generator = AnswerGenerator::new(llm, GeneratorConfig::new("mock-model"));

        Arc::new(KnowledgeService::new(
            store,
            gateway,
            generator,
            Normalizer::new(NormalizerConfig::default()),
            Arc::new(BoundaryChunker::new()),
            ServiceDefaults::default(),
        ))
    }

    fn tenant(name: &str) -> TenantId {
        TenantId::new(name).unwrap()
    }

    fn pump_manual_request() -> IngestRequest {
        IngestRequest::new(
            "Pump P-300 Manual",
            "manual/p-300",
            SourceContent::manual(
                "Pump P-300 operating data. Flow Rate: 300 L/min. Max Pressure: 8 bar.",
            ),
        )
    }

    #[tokio::test]
    async fn test_ingest_returns_receipt() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");

        let receipt = service
            .ingest(&acme, pump_manual_request(), IngestOptions::new())
            .await
            .unwrap();

        assert!(receipt.chunks_created >= 1);
        assert!(receipt.tokens_processed > 0);
    }

    #[tokio::test]
    async fn test_ingest_empty_content_rejected_pre_side_effect() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");

        let request = IngestRequest::new("Empty", "doc/empty", SourceContent::document("   "));
        let result = service.ingest(&acme, request, IngestOptions::new()).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));

        let entries = service
            .list_entries(&acme, EntryFilter::new())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_pump_scenario_query_and_generate() {
        let llm =
            Arc::new(MockLlmProvider::new().with_answer("The pump's flow rate is 300 L/min [1]."));
        let service = build_service(llm);
        let acme = tenant("acme");

        service
            .ingest(
                &acme,
                pump_manual_request(),
                IngestOptions::new()
                    .with_chunk_size(400)
                    .with_chunk_overlap(80),
            )
            .await
            .unwrap();

        let outcome = service
            .query(
                &acme,
                QueryRequest::new("pump flow rate").with_similarity_threshold(0.5),
            )
            .await
            .unwrap();

        assert!(!outcome.is_empty());
        assert!(outcome.chunks[0].content.contains("300 L/min"));
        assert!(outcome.chunks[0].similarity >= 0.5);

        let generation = service
            .generate(&acme, GenerateRequest::new("pump flow rate"))
            .await
            .unwrap();

        assert!(!generation.degraded);
        assert!(generation.answer.contains("300"));
        assert!(generation
            .citations
            .iter()
            .any(|c| c.title == "Pump P-300 Manual"));
        assert!(generation
            .sources
            .contains(&"Pump P-300 Manual".to_string()));
    }

    #[tokio::test]
    async fn test_round_trip_deletion() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");

        let receipt = service
            .ingest(&acme, pump_manual_request(), IngestOptions::new())
            .await
            .unwrap();

        assert!(service
            .delete(&acme, receipt.knowledge_base_id)
            .await
            .unwrap());

        let outcome = service
            .query(&acme, QueryRequest::new("pump flow rate"))
            .await
            .unwrap();
        assert!(outcome.is_empty());

        assert!(!service
            .delete(&acme, receipt.knowledge_base_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_threshold_above_max_returns_empty() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");

        service
            .ingest(&acme, pump_manual_request(), IngestOptions::new())
            .await
            .unwrap();

        let outcome = service
            .query(
                &acme,
                QueryRequest::new("totally unrelated query").with_similarity_threshold(1.0),
            )
            .await
            .unwrap();

        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_generate_without_grounding_degrades() {
        let llm = Arc::new(MockLlmProvider::new().with_answer("should not be used"));
        let service = build_service(llm.clone());
        let acme = tenant("acme");

        let result = service
            .generate(&acme, GenerateRequest::new("pump flow rate"))
            .await
            .unwrap();

        assert!(result.degraded);
        assert!(result.citations.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reingestion_replaces_previous_version() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");

        service
            .ingest(&acme, pump_manual_request(), IngestOptions::new())
            .await
            .unwrap();

        let updated = IngestRequest::new(
            "Pump P-300 Manual",
            "manual/p-300",
            SourceContent::manual("Pump P-300 revised data. Flow Rate: 320 L/min."),
        );
        service
            .ingest(&acme, updated, IngestOptions::new())
            .await
            .unwrap();

        let entries = service
            .list_entries(&acme, EntryFilter::new())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);

        let outcome = service
            .query(
                &acme,
                QueryRequest::new("pump flow rate").with_similarity_threshold(0.1),
            )
            .await
            .unwrap();

        assert!(outcome.chunks.iter().all(|c| !c.content.contains("300 L/min")));
        assert!(outcome.chunks.iter().any(|c| c.content.contains("320 L/min")));
    }

    #[tokio::test]
    async fn test_batch_reports_per_item_outcomes() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");

        let requests = vec![
            pump_manual_request(),
            IngestRequest::new("Empty", "doc/empty", SourceContent::document("  ")),
            IngestRequest::new(
                "Valve Guide",
                "doc/valve",
                SourceContent::document("Valve V-100 handles a flow rate of 50 L/min."),
            ),
        ];

        let report = service
            .ingest_batch(&acme, requests, IngestOptions::new())
            .await
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.successful, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.items[1].source_id, "doc/empty");
        assert!(report.items[1].error.is_some());
    }

    #[tokio::test]
    async fn test_tenant_isolation_across_service() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");
        let globex = tenant("globex");

        service
            .ingest(&acme, pump_manual_request(), IngestOptions::new())
            .await
            .unwrap();

        let outcome = service
            .query(&globex, QueryRequest::new("pump flow rate"))
            .await
            .unwrap();

        assert!(outcome.is_empty());

        let stats = service.stats(&globex).await.unwrap();
        assert_eq!(stats.total_knowledge_bases, 0);
    }

    #[tokio::test]
    async fn test_stats_after_ingestion() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");

        service
            .ingest(&acme, pump_manual_request(), IngestOptions::new())
            .await
            .unwrap();

        let stats = service.stats(&acme).await.unwrap();

        assert_eq!(stats.total_knowledge_bases, 1);
        assert!(stats.total_chunks >= 1);
        assert_eq!(stats.source_type_breakdown.get("manual"), Some(&1));
    }

    #[tokio::test]
    async fn test_fifty_concurrent_ingests() {
        let service = build_service(Arc::new(MockLlmProvider::new()));
        let acme = tenant("acme");

        let mut handles = Vec::new();

        for i in 0..50 {
            let service = service.clone();
            let acme = acme.clone();

            handles.push(tokio::spawn(async move {
                let request = IngestRequest::new(
                    format!("Document {}", i),
                    format!("doc/{}", i),
                    SourceContent::document(format!(
                        "Document number {} covers pump maintenance topic {}.",
                        i, i
                    )),
                );
                service.ingest(&acme, request, IngestOptions::new()).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let entries = service
            .list_entries(&acme, EntryFilter::new())
            .await
            .unwrap();
        assert_eq!(entries.len(), 50);

        // chunk_index values are scoped per entry; every entry carries its
        // own contiguous set
        let stats = service.stats(&acme).await.unwrap();
        let total_from_entries: i64 = entries.iter().map(|e| e.chunk_count).sum();
        assert_eq!(stats.total_chunks, total_from_entries);
        assert!(entries.iter().all(|e| e.chunk_count >= 1));
    }
}
