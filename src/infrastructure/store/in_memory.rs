//! In-memory knowledge store for development and testing
//!
//! Implements the same contract as the Postgres store with brute-force
//! cosine ranking over the tenant's chunks. The write lock is held for the
//! whole replace so readers never observe a partially replaced chunk set.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::knowledge::{
    validate_chunk_indexes, EntryFilter, EntrySummary, KnowledgeBaseEntry, KnowledgeStore,
    RetrievalResult, SearchFilter, StoredChunk, TenantId, TenantStats,
};
use crate::domain::DomainError;

use super::cosine_similarity;

#[derive(Debug, Default)]
struct Tables {
    entries: HashMap<Uuid, KnowledgeBaseEntry>,
    chunks: HashMap<Uuid, Vec<StoredChunk>>,
}

/// In-memory knowledge store
#[derive(Debug)]
pub struct InMemoryKnowledgeStore {
    dimension: usize,
    inner: Arc<RwLock<Tables>>,
}

impl InMemoryKnowledgeStore {
    /// Create a new store with the deployment's embedding dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            inner: Arc::new(RwLock::new(Tables::default())),
        }
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

            if chunk.embedding().len() != self.dimension {
                return Err(DomainError::validation(format!(
                    "embedding dimension mismatch: expected {}, received {}",
                    self.dimension,
                    chunk.embedding().len()
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn upsert(
        &self,
        entry: KnowledgeBaseEntry,
        chunks: Vec<StoredChunk>,
    ) -> Result<Uuid, DomainError> {
        self.validate_write(&entry, &chunks)?;

        let mut tables = self.inner.write().await;

        // Replace any previous entry for the same logical source
        let replaced: Option<Uuid> = tables
            .entries
            .values()
            .find(|existing| {
                existing.tenant_id() == entry.tenant_id()
                    && existing.source_type() == entry.source_type()
                    && existing.source_id() == entry.source_id()
            })
            .map(|existing| existing.id());

        if let Some(old_id) = replaced {
            tables.entries.remove(&old_id);
            tables.chunks.remove(&old_id);
        }

        let entry_id = entry.id();
        tables.chunks.insert(entry_id, chunks);
        tables.entries.insert(entry_id, entry);

        Ok(entry_id)
    }

    async fn delete(&self, tenant_id: &TenantId, entry_id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.inner.write().await;

        let owned = tables
            .entries
            .get(&entry_id)
            .map(|entry| entry.tenant_id() == tenant_id)
            .unwrap_or(false);

        if !owned {
            return Ok(false);
        }

        tables.entries.remove(&entry_id);
        tables.chunks.remove(&entry_id);

        Ok(true)
    }

    async fn get_entry(
        &self,
        tenant_id: &TenantId,
        entry_id: Uuid,
    ) -> Result<Option<KnowledgeBaseEntry>, DomainError> {
        let tables = self.inner.read().await;

        Ok(tables
            .entries
            .get(&entry_id)
            .filter(|entry| entry.tenant_id() == tenant_id)
            .cloned())
    }

    async fn list_entries(
        &self,
        tenant_id: &TenantId,
        filter: EntryFilter,
    ) -> Result<Vec<EntrySummary>, DomainError> {
        let tables = self.inner.read().await;

        let mut summaries: Vec<EntrySummary> = tables
            .entries
            .values()
            .filter(|entry| entry.tenant_id() == tenant_id)
            .filter(|entry| filter.matches(entry.source_type(), entry.source_id()))
            .map(|entry| EntrySummary {
                id: entry.id(),
                source_type: entry.source_type(),
                source_id: entry.source_id().to_string(),
                title: entry.title().to_string(),
                chunk_count: tables
                    .chunks
                    .get(&entry.id())
                    .map(|chunks| chunks.len() as i64)
                    .unwrap_or(0),
                created_at: entry.created_at(),
                updated_at: entry.updated_at(),
            })
            .collect();

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(summaries)
    }

    async fn similarity_search(
        &self,
        tenant_id: &TenantId,
        query_embedding: &[f32],
        filter: SearchFilter,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, DomainError> {
        if query_embedding.len() != self.dimension {
            return Err(DomainError::validation(format!(
                "query embedding dimension mismatch: expected {}, received {}",
                self.dimension,
                query_embedding.len()
            )));
        }

        let tables = self.inner.read().await;
        let mut matches: Vec<RetrievalResult> = Vec::new();

        for entry in tables.entries.values() {
            if entry.tenant_id() != tenant_id || !filter.matches(entry.source_type()) {
                continue;
            }

            let Some(chunks) = tables.chunks.get(&entry.id()) else {
                continue;
            };

            for chunk in chunks {
                let similarity = cosine_similarity(query_embedding, chunk.embedding());

                matches.push(
                    RetrievalResult::new(chunk.id(), entry.id(), chunk.content(), similarity)
                        .with_provenance(entry.title(), entry.source_type())
                        .with_chunk_index(chunk.chunk_index()),
                );
            }
        }

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.knowledge_base_id.cmp(&b.knowledge_base_id))
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        matches.truncate(limit);

        Ok(matches)
    }

    async fn stats(&self, tenant_id: &TenantId) -> Result<TenantStats, DomainError> {
        let tables = self.inner.read().await;

        let mut stats = TenantStats::empty();
        let mut total_chunk_bytes: i64 = 0;

        for entry in tables.entries.values() {
            if entry.tenant_id() != tenant_id {
                continue;
            }

            stats.total_knowledge_bases += 1;
            *stats
                .source_type_breakdown
                .entry(entry.source_type().as_str().to_string())
                .or_insert(0) += 1;

            stats.last_updated = match stats.last_updated {
                Some(latest) if latest >= entry.updated_at() => Some(latest),
                _ => Some(entry.updated_at()),
            };

            if let Some(chunks) = tables.chunks.get(&entry.id()) {
                stats.total_chunks += chunks.len() as i64;
                total_chunk_bytes += chunks.iter().map(|c| c.chunk_size() as i64).sum::<i64>();
            }
        }

        if stats.total_chunks > 0 {
            stats.average_chunk_size = total_chunk_bytes as f64 / stats.total_chunks as f64;
        }

        Ok(stats)
    }

    async fn health_check(&self) -> Result<bool, DomainError> {
        Ok(true)
    }
}
