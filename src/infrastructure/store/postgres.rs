//! PostgreSQL knowledge store
//!
//! Persisted layout:
//!
//! ```sql
//! knowledge_base_entries(id, tenant_id, source_type, source_id, title,
//!                        content, metadata, created_at, updated_at,
//!                        UNIQUE (tenant_id, source_type, source_id))
//! chunks(id, knowledge_base_id REFERENCES knowledge_base_entries ON DELETE CASCADE,
//!        tenant_id, content, embedding, chunk_index, chunk_size, token_count,
//!        embedding_model_version, metadata, created_at,
//!        UNIQUE (knowledge_base_id, chunk_index))
//! ```
//!
//! Schema migration is owned by the deployment; `ensure_schema` exists for
//! dev and test setups only.
//!
//! Two interchangeable search strategies: `NativeIndex` delegates ranking to
//! pgvector's cosine operator, `LinearScan` pulls a tenant-narrowed
//! candidate set and ranks in process for deployments without pgvector. The
//! fallback's ceiling is the candidate set size (`linear_scan_limit`);
//! prefer the native index once tenants grow past that row count.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::knowledge::{
    validate_chunk_indexes, EntryFilter, EntrySummary, KnowledgeBaseEntry, KnowledgeStore,
    RetrievalResult, SearchFilter, SourceType, StoredChunk, TenantId, TenantStats,
};
use crate::domain::DomainError;

use super::cosine_similarity;

/// Similarity search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Delegate nearest-neighbour ranking to pgvector
    NativeIndex,
    /// Brute-force cosine over a metadata-narrowed candidate set
    LinearScan,
}

impl FromStr for SearchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native_index" => Ok(Self::NativeIndex),
            "linear_scan" => Ok(Self::LinearScan),
            other => Err(format!("unknown search strategy '{}'", other)),
        }
    }
}

/// Configuration for the Postgres store
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    /// Fixed embedding dimension for this deployment
    pub dimension: usize,
    /// Active search strategy
    pub strategy: SearchStrategy,
    /// Maximum candidate rows fetched per linear-scan search
    pub linear_scan_limit: usize,
}

impl PgStoreConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            strategy: SearchStrategy::NativeIndex,
            linear_scan_limit: 10_000,
        }
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_linear_scan_limit(mut self, limit: usize) -> Self {
        self.linear_scan_limit = limit.max(1);
        self
    }
}

/// PostgreSQL-backed knowledge store
#[derive(Debug)]
pub struct PgKnowledgeStore {
    pool: PgPool,
    config: PgStoreConfig,
}

impl PgKnowledgeStore {
    pub fn new(pool: PgPool, config: PgStoreConfig) -> Self {
        Self { pool, config }
    }

    /// Create tables and indexes for dev/test deployments
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        if self.config.strategy == SearchStrategy::NativeIndex {
            sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to create vector extension: {}", e))
                })?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_base_entries (
                id UUID PRIMARY KEY,
                tenant_id VARCHAR(64) NOT NULL,
                source_type VARCHAR(32) NOT NULL,
                source_id VARCHAR(255) NOT NULL,
                title VARCHAR(500) NOT NULL,
                content TEXT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (tenant_id, source_type, source_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create entries table: {}", e)))?;

        let embedding_column = match self.config.strategy {
            SearchStrategy::NativeIndex => format!("vector({})", self.config.dimension),
            SearchStrategy::LinearScan => "real[]".to_string(),
        };

        let chunks_ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id UUID PRIMARY KEY,
                knowledge_base_id UUID NOT NULL
                    REFERENCES knowledge_base_entries(id) ON DELETE CASCADE,
                tenant_id VARCHAR(64) NOT NULL,
                content TEXT NOT NULL,
                embedding {} NOT NULL,
                chunk_index INTEGER NOT NULL,
                chunk_size INTEGER NOT NULL,
                token_count INTEGER NOT NULL,
                embedding_model_version VARCHAR(128) NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{{}}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (knowledge_base_id, chunk_index)
            )
            "#,
            embedding_column
        );

        sqlx::query(&chunks_ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create chunks table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_entries_tenant ON knowledge_base_entries (tenant_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create tenant index: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_tenant ON chunks (tenant_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create chunk index: {}", e)))?;

        if self.config.strategy == SearchStrategy::NativeIndex {
            // IVFFlat needs data to build; ignore failures on empty tables
            let _ = sqlx::query(
                "CREATE INDEX IF NOT EXISTS idx_chunks_embedding ON chunks \
                 USING ivfflat (embedding vector_cosine_ops)",
            )
            .execute(&self.pool)
            .await;
        }

        Ok(())
    }

    fn validate_write(
        &self,
        entry: &KnowledgeBaseEntry,
        chunks: &[StoredChunk],
    ) -> Result<(), DomainError> {
        if chunks.is_empty() {
            return Err(DomainError::validation(
                "an entry must be stored with at least one chunk",
            ));
        }

        validate_chunk_indexes(chunks).map_err(DomainError::validation)?;

        for chunk in chunks {
            if chunk.knowledge_base_id() != entry.id() {
                return Err(DomainError::validation(
                    "chunk does not belong to the entry being stored",
                ));
            }

            if chunk.tenant_id() != entry.tenant_id() {
                return Err(DomainError::validation(
                    "chunk tenant does not match entry tenant",
                ));
            }

            if chunk.embedding().len() != self.config.dimension {
                return Err(DomainError::validation(format!(
                    "embedding dimension mismatch: expected {}, received {}",
                    self.config.dimension,
                    chunk.embedding().len()
                )));
            }
        }

        Ok(())
    }

    async fn search_native(
        &self,
        tenant_id: &TenantId,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, DomainError> {
        let vector_literal = embedding_to_vector_literal(query_embedding);

        let type_filter = if filter.source_types.is_empty() {
            String::new()
        } else {
            " AND e.source_type = ANY($4)".to_string()
        };

        let sql = format!(
            r#"
            SELECT c.id, c.knowledge_base_id, c.content, c.chunk_index,
                   e.title, e.source_type,
                   (c.embedding <=> $2::vector) AS distance
            FROM chunks c
            JOIN knowledge_base_entries e ON c.knowledge_base_id = e.id
            WHERE c.tenant_id = $1{}
            ORDER BY distance ASC, c.knowledge_base_id, c.chunk_index
            LIMIT $3
            "#,
            type_filter
        );

        let mut query = sqlx::query(&sql)
            .bind(tenant_id.as_str())
            .bind(&vector_literal)
            .bind(limit as i64);

        if !filter.source_types.is_empty() {
            let types: Vec<String> = filter
                .source_types
                .iter()
                .map(|t| t.as_str().to_string())
                .collect();
            query = query.bind(types);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Similarity search failed: {}", e)))?;

        let mut results = Vec::with_capacity(rows.len());

        for row in rows {
            let distance: f64 = row.get("distance");
            let similarity = ((1.0 - distance) as f32).clamp(0.0, 1.0);

            results.push(row_to_retrieval_result(&row, similarity)?);
        }

        Ok(results)
    }

    async fn search_linear(
        &self,
        tenant_id: &TenantId,
        query_embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, DomainError> {
        let type_filter = if filter.source_types.is_empty() {
            String::new()
        } else {
            " AND e.source_type = ANY($3)".to_string()
        };

        let sql = format!(
            r#"
            SELECT c.id, c.knowledge_base_id, c.content, c.chunk_index, c.embedding,
                   e.title, e.source_type
            FROM chunks c
            JOIN knowledge_base_entries e ON c.knowledge_base_id = e.id
            WHERE c.tenant_id = $1{}
            ORDER BY c.knowledge_base_id, c.chunk_index
            LIMIT $2
            "#,
            type_filter
        );

        let mut query = sqlx::query(&sql)
            .bind(tenant_id.as_str())
            .bind(self.config.linear_scan_limit as i64);

        if !filter.source_types.is_empty() {
            let types: Vec<String> = filter
                .source_types
                .iter()
                .map(|t| t.as_str().to_string())
                .collect();
            query = query.bind(types);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Candidate fetch failed: {}", e)))?;

        let mut results = Vec::with_capacity(rows.len());

        for row in rows {
            let embedding: Vec<f32> = row.get("embedding");
            let similarity = cosine_similarity(query_embedding, &embedding);

            results.push(row_to_retrieval_result(&row, similarity)?);
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.knowledge_base_id.cmp(&b.knowledge_base_id))
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        results.truncate(limit);

        Ok(results)
    }
}

#[async_trait]
impl KnowledgeStore for PgKnowledgeStore {
    async fn upsert(
        &self,
        entry: KnowledgeBaseEntry,
        chunks: Vec<StoredChunk>,
    ) -> Result<Uuid, DomainError> {
        self.validate_write(&entry, &chunks)?;

        // The replace runs inside one transaction: readers keep seeing the
        // old chunk set until commit, and cancellation rolls back cleanly.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        // Row lock serializes concurrent writers to the same logical source
        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM knowledge_base_entries
            WHERE tenant_id = $1 AND source_type = $2 AND source_id = $3
            FOR UPDATE
            "#,
        )
        .bind(entry.tenant_id().as_str())
        .bind(entry.source_type().as_str())
        .bind(entry.source_id())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to look up existing entry: {}", e)))?;

        if let Some(old_id) = existing {
            sqlx::query("DELETE FROM knowledge_base_entries WHERE id = $1")
                .bind(old_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to delete replaced entry: {}", e))
                })?;
        }

        let metadata = serde_json::to_value(entry.metadata())
            .map_err(|e| DomainError::internal(format!("Failed to serialize metadata: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO knowledge_base_entries
            (id, tenant_id, source_type, source_id, title, content, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id())
        .bind(entry.tenant_id().as_str())
        .bind(entry.source_type().as_str())
        .bind(entry.source_id())
        .bind(entry.title())
        .bind(entry.content())
        .bind(&metadata)
        .bind(entry.created_at())
        .bind(entry.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to insert entry: {}", e)))?;

        for chunk in &chunks {
            let chunk_metadata = serde_json::to_value(chunk.metadata()).map_err(|e| {
                DomainError::internal(format!("Failed to serialize chunk metadata: {}", e))
            })?;

            let insert = match self.config.strategy {
                SearchStrategy::NativeIndex => sqlx::query(
                    r#"
                    INSERT INTO chunks
                    (id, knowledge_base_id, tenant_id, content, embedding, chunk_index,
                     chunk_size, token_count, embedding_model_version, metadata, created_at)
                    VALUES ($1, $2, $3, $4, $5::vector, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(chunk.id())
                .bind(chunk.knowledge_base_id())
                .bind(chunk.tenant_id().as_str())
                .bind(chunk.content())
                .bind(embedding_to_vector_literal(chunk.embedding()))
                .bind(chunk.chunk_index())
                .bind(chunk.chunk_size())
                .bind(chunk.token_count())
                .bind(chunk.embedding_model_version())
                .bind(&chunk_metadata)
                .bind(chunk.created_at()),
                SearchStrategy::LinearScan => sqlx::query(
                    r#"
                    INSERT INTO chunks
                    (id, knowledge_base_id, tenant_id, content, embedding, chunk_index,
                     chunk_size, token_count, embedding_model_version, metadata, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(chunk.id())
                .bind(chunk.knowledge_base_id())
                .bind(chunk.tenant_id().as_str())
                .bind(chunk.content())
                .bind(chunk.embedding().to_vec())
                .bind(chunk.chunk_index())
                .bind(chunk.chunk_size())
                .bind(chunk.token_count())
                .bind(chunk.embedding_model_version())
                .bind(&chunk_metadata)
                .bind(chunk.created_at()),
            };

            insert
                .execute(&mut *tx)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to insert chunk: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit ingestion: {}", e)))?;

        Ok(entry.id())
    }

    async fn delete(&self, tenant_id: &TenantId, entry_id: Uuid) -> Result<bool, DomainError> {
        // Chunks go via ON DELETE CASCADE
        let result = sqlx::query(
            "DELETE FROM knowledge_base_entries WHERE id = $1 AND tenant_id = $2",
        )
        .bind(entry_id)
        .bind(tenant_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to delete entry: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_entry(
        &self,
        tenant_id: &TenantId,
        entry_id: Uuid,
    ) -> Result<Option<KnowledgeBaseEntry>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, source_type, source_id, title, content, metadata,
                   created_at, updated_at
            FROM knowledge_base_entries
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(entry_id)
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to fetch entry: {}", e)))?;

        match row {
            Some(row) => {
                let source_type = parse_source_type(&row.get::<String, _>("source_type"))?;
                let metadata: serde_json::Value = row.get("metadata");
                let metadata_map: HashMap<String, serde_json::Value> =
                    serde_json::from_value(metadata).unwrap_or_default();

                Ok(Some(
                    KnowledgeBaseEntry::new(
                        tenant_id.clone(),
                        source_type,
                        row.get::<String, _>("source_id"),
                        row.get::<String, _>("title"),
                        row.get::<String, _>("content"),
                    )
                    .with_id(row.get("id"))
                    .with_metadata(metadata_map)
                    .with_timestamps(row.get("created_at"), row.get("updated_at")),
                ))
            }
            None => Ok(None),
        }
    }

    async fn list_entries(
        &self,
        tenant_id: &TenantId,
        filter: EntryFilter,
    ) -> Result<Vec<EntrySummary>, DomainError> {
        let mut conditions = vec!["e.tenant_id = $1".to_string()];
        let mut bind_index = 2;

        if !filter.source_types.is_empty() {
            conditions.push(format!("e.source_type = ANY(${})", bind_index));
            bind_index += 1;
        }

        if filter.source_id.is_some() {
            conditions.push(format!("e.source_id = ${}", bind_index));
        }

        let sql = format!(
            r#"
            SELECT e.id, e.source_type, e.source_id, e.title, e.created_at, e.updated_at,
                   (SELECT COUNT(*) FROM chunks c WHERE c.knowledge_base_id = e.id) AS chunk_count
            FROM knowledge_base_entries e
            WHERE {}
            ORDER BY e.created_at DESC, e.id
            "#,
            conditions.join(" AND ")
        );

        let mut query = sqlx::query(&sql).bind(tenant_id.as_str());

        if !filter.source_types.is_empty() {
            let types: Vec<String> = filter
                .source_types
                .iter()
                .map(|t| t.as_str().to_string())
                .collect();
            query = query.bind(types);
        }

        if let Some(ref source_id) = filter.source_id {
            query = query.bind(source_id.clone());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list entries: {}", e)))?;

        let mut summaries = Vec::with_capacity(rows.len());

        for row in rows {
            summaries.push(EntrySummary {
                id: row.get("id"),
                source_type: parse_source_type(&row.get::<String, _>("source_type"))?,
                source_id: row.get("source_id"),
                title: row.get("title"),
                chunk_count: row.get("chunk_count"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(summaries)
    }

    async fn similarity_search(
        &self,
        tenant_id: &TenantId,
        query_embedding: &[f32],
        filter: SearchFilter,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, DomainError> {
        if query_embedding.len() != self.config.dimension {
            return Err(DomainError::validation(format!(
                "query embedding dimension mismatch: expected {}, received {}",
                self.config.dimension,
                query_embedding.len()
            )));
        }

        match self.config.strategy {
            SearchStrategy::NativeIndex => {
                self.search_native(tenant_id, query_embedding, &filter, limit)
                    .await
            }
            SearchStrategy::LinearScan => {
                self.search_linear(tenant_id, query_embedding, &filter, limit)
                    .await
            }
        }
    }

    async fn stats(&self, tenant_id: &TenantId) -> Result<TenantStats, DomainError> {
        let entry_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_entries, MAX(updated_at) AS last_updated
            FROM knowledge_base_entries
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to compute entry stats: {}", e)))?;

        let chunk_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_chunks,
                   COALESCE(AVG(chunk_size), 0)::double precision AS average_chunk_size
            FROM chunks
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to compute chunk stats: {}", e)))?;

        let breakdown_rows = sqlx::query(
            r#"
            SELECT source_type, COUNT(*) AS entry_count
            FROM knowledge_base_entries
            WHERE tenant_id = $1
            GROUP BY source_type
            "#,
        )
        .bind(tenant_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to compute breakdown: {}", e)))?;

        let mut breakdown = HashMap::new();
        for row in breakdown_rows {
            breakdown.insert(
                row.get::<String, _>("source_type"),
                row.get::<i64, _>("entry_count"),
            );
        }

        Ok(TenantStats {
            total_knowledge_bases: entry_row.get("total_entries"),
            total_chunks: chunk_row.get("total_chunks"),
            average_chunk_size: chunk_row.get("average_chunk_size"),
            source_type_breakdown: breakdown,
            last_updated: entry_row.get("last_updated"),
        })
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Health check failed: {}", e)))?;

        Ok(true)
    }
}

fn row_to_retrieval_result(
    row: &sqlx::postgres::PgRow,
    similarity: f32,
) -> Result<RetrievalResult, DomainError> {
    let source_type = parse_source_type(&row.get::<String, _>("source_type"))?;

    Ok(RetrievalResult::new(
        row.get("id"),
        row.get("knowledge_base_id"),
        row.get::<String, _>("content"),
        similarity,
    )
    .with_provenance(row.get::<String, _>("title"), source_type)
    .with_chunk_index(row.get("chunk_index")))
}

fn parse_source_type(raw: &str) -> Result<SourceType, DomainError> {
    raw.parse()
        .map_err(|e: String| DomainError::storage(format!("Corrupt source_type column: {}", e)))
}

fn embedding_to_vector_literal(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}
