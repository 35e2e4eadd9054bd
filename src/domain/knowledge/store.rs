//! Knowledge store trait and search types

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::chunk::StoredChunk;
use super::entity::{EntryFilter, EntrySummary, KnowledgeBaseEntry, SourceType, TenantId};
use crate::domain::error::DomainError;

/// A chunk returned from similarity search, with provenance
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    /// Chunk identifier
    pub chunk_id: Uuid,
    /// Owning entry identifier
    pub knowledge_base_id: Uuid,
    /// Chunk content
    pub content: String,
    /// Cosine similarity in [0, 1]
    pub similarity: f32,
    /// Title of the owning entry
    pub title: String,
    /// Source type of the owning entry
    pub source_type: SourceType,
    /// Ordinal of the chunk within its entry
    pub chunk_index: i32,
}

impl RetrievalResult {
    pub fn new(
        chunk_id: Uuid,
        knowledge_base_id: Uuid,
        content: impl Into<String>,
        similarity: f32,
    ) -> Self {
        Self {
            chunk_id,
            knowledge_base_id,
            content: content.into(),
            similarity,
            title: String::new(),
            source_type: SourceType::Document,
            chunk_index: 0,
        }
    }

    pub fn with_provenance(mut self, title: impl Into<String>, source_type: SourceType) -> Self {
        self.title = title.into();
        self.source_type = source_type;
        self
    }

    pub fn with_chunk_index(mut self, index: i32) -> Self {
        self.chunk_index = index;
        self
    }
}

/// Narrowing filter for similarity search
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Restrict to the given source types (empty means all)
    pub source_types: Vec<SourceType>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_types(mut self, source_types: Vec<SourceType>) -> Self {
        self.source_types = source_types;
        self
    }

    pub fn matches(&self, source_type: SourceType) -> bool {
        self.source_types.is_empty() || self.source_types.contains(&source_type)
    }
}

/// Per-tenant knowledge base statistics
#[derive(Debug, Clone, Serialize)]
pub struct TenantStats {
    pub total_knowledge_bases: i64,
    pub total_chunks: i64,
    pub average_chunk_size: f64,
    pub source_type_breakdown: HashMap<String, i64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl TenantStats {
    pub fn empty() -> Self {
        Self {
            total_knowledge_bases: 0,
            total_chunks: 0,
            average_chunk_size: 0.0,
            source_type_breakdown: HashMap::new(),
            last_updated: None,
        }
    }
}

/// Persistence contract for entries and their chunks
///
/// Implementations must scope every operation by tenant at the storage layer
/// itself; callers cannot opt out of isolation. `upsert` replaces the entire
/// chunk set of an existing logical source atomically, so readers never
/// observe a partially replaced chunk set.
#[async_trait]
pub trait KnowledgeStore: Send + Sync + Debug {
    /// Transactionally create or replace an entry and its chunks
    ///
    /// Replacement is keyed by (tenant_id, source_type, source_id). Rejects
    /// chunk_index values that are not contiguous from zero and embeddings
    /// whose dimension does not match the deployment dimension. Returns the
    /// id under which the entry is stored.
    async fn upsert(
        &self,
        entry: KnowledgeBaseEntry,
        chunks: Vec<StoredChunk>,
    ) -> Result<Uuid, DomainError>;

    /// Cascading delete; returns false (not an error) when the entry is absent
    async fn delete(&self, tenant_id: &TenantId, entry_id: Uuid) -> Result<bool, DomainError>;

    /// Fetch a single entry
    async fn get_entry(
        &self,
        tenant_id: &TenantId,
        entry_id: Uuid,
    ) -> Result<Option<KnowledgeBaseEntry>, DomainError>;

    /// Metadata-only listing of a tenant's entries
    async fn list_entries(
        &self,
        tenant_id: &TenantId,
        filter: EntryFilter,
    ) -> Result<Vec<EntrySummary>, DomainError>;

    /// Ranked nearest-neighbour search over the tenant's chunks
    ///
    /// Results are ordered by descending similarity and never contain chunks
    /// of another tenant.
    async fn similarity_search(
        &self,
        tenant_id: &TenantId,
        query_embedding: &[f32],
        filter: SearchFilter,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, DomainError>;

    /// Per-tenant statistics
    async fn stats(&self, tenant_id: &TenantId) -> Result<TenantStats, DomainError>;

    /// Whether the backing storage is reachable
    async fn health_check(&self) -> Result<bool, DomainError>;
}
