//! Domain layer: entities, provider traits and the error taxonomy

pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod knowledge;
pub mod retrieval;

pub use error::DomainError;

pub use knowledge::{
    EntryFilter, EntrySummary, KnowledgeBaseEntry, KnowledgeStore, RetrievalResult, SearchFilter,
    SourceContent, SourceType, StoredChunk, TenantId, TenantStats,
};

pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};

pub use generation::{Citation, GenerationResult, LlmProvider, LlmRequest, LlmResponse, Message};

pub use ingestion::{
    BatchIngestionReport, BatchItemOutcome, ChunkingConfig, ChunkingStrategy, IngestOptions,
    IngestionReceipt, NormalizedDocument, TextChunk,
};

pub use retrieval::{QueryContext, RetrievalOutcome};
