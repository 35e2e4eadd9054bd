//! Stored chunk entity

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::TenantId;

/// A chunk of an entry stored with its embedding
///
/// Chunk indexes are contiguous from 0 within an entry; the embedding
/// dimension is fixed per deployment and validated before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    id: Uuid,
    knowledge_base_id: Uuid,
    tenant_id: TenantId,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    embedding: Vec<f32>,
    chunk_index: i32,
    chunk_size: i32,
    token_count: i32,
    embedding_model_version: String,
    metadata: HashMap<String, serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl StoredChunk {
    /// Create a new chunk
    pub fn new(
        knowledge_base_id: Uuid,
        tenant_id: TenantId,
        chunk_index: i32,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let chunk_size = content.len() as i32;

        Self {
            id: Uuid::new_v4(),
            knowledge_base_id,
            tenant_id,
            content,
            embedding: Vec::new(),
            chunk_index,
            chunk_size,
            token_count: 0,
            embedding_model_version: String::new(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Create with a specific id (for loading from storage)
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_token_count(mut self, count: i32) -> Self {
        self.token_count = count;
        self
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.embedding_model_version = version.into();
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    // Getters

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn knowledge_base_id(&self) -> Uuid {
        self.knowledge_base_id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn chunk_index(&self) -> i32 {
        self.chunk_index
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    pub fn token_count(&self) -> i32 {
        self.token_count
    }

    pub fn embedding_model_version(&self) -> &str {
        &self.embedding_model_version
    }

    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Verify that chunk indexes are contiguous from zero
pub fn validate_chunk_indexes(chunks: &[StoredChunk]) -> Result<(), String> {
    for (expected, chunk) in chunks.iter().enumerate() {
        if chunk.chunk_index() != expected as i32 {
            return Err(format!(
                "chunk_index values must be contiguous from 0; found {} at position {}",
                chunk.chunk_index(),
                expected
            ));
        }
    }

    Ok(())
}
