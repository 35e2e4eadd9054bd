//! Ingestion domain: normalization, chunking and pipeline result types

pub mod chunker;
pub mod normalizer;
pub mod pipeline;

pub use chunker::{ChunkMetadata, ChunkingConfig, ChunkingStrategy, TextChunk};
pub use normalizer::NormalizedDocument;
pub use pipeline::{BatchIngestionReport, BatchItemOutcome, IngestOptions, IngestionReceipt};

#[cfg(test)]
pub use chunker::mock::MockChunkingStrategy;
