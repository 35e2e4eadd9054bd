//! Retrieval domain: query context and outcome types

use serde::Serialize;

use crate::domain::error::DomainError;
use crate::domain::knowledge::{RetrievalResult, SourceType, TenantId};

/// A retrieval query with its tenant scope and constraints
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub tenant_id: TenantId,
    pub query: String,
    /// Restrict to the given source types (empty means all)
    pub source_types: Vec<SourceType>,
    /// Maximum number of results
    pub limit: usize,
    /// Minimum cosine similarity in [0, 1]
    pub similarity_threshold: f32,
    /// Optional cap on results per source type, applied when results span
    /// multiple source types so one type cannot fill every slot
    pub per_type_cap: Option<usize>,
}

impl QueryContext {
    pub fn new(tenant_id: TenantId, query: impl Into<String>) -> Self {
        Self {
            tenant_id,
            query: query.into(),
            source_types: Vec::new(),
            limit: 10,
            similarity_threshold: 0.5,
            per_type_cap: None,
        }
    }

    pub fn with_source_types(mut self, source_types: Vec<SourceType>) -> Self {
        self.source_types = source_types;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_per_type_cap(mut self, cap: usize) -> Self {
        self.per_type_cap = Some(cap);
        self
    }

    /// Validate the query constraints
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.query.trim().is_empty() {
            return Err(DomainError::validation("query text must not be empty"));
        }

        if self.limit == 0 {
            return Err(DomainError::validation("limit must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(DomainError::validation(
                "similarity_threshold must be within [0, 1]",
            ));
        }

        Ok(())
    }
}

/// Ranked, thresholded retrieval outcome
///
/// An empty chunk list is a valid outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutcome {
    pub chunks: Vec<RetrievalResult>,
    pub processing_time_ms: u64,
}

impl RetrievalOutcome {
    pub fn new(chunks: Vec<RetrievalResult>, processing_time_ms: u64) -> Self {
        Self {
            chunks,
            processing_time_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
