//! Chunking strategy trait and types

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::error::DomainError;

/// Configuration for chunking
///
/// Sizes are expressed in tokens, approximated as whitespace-delimited words
/// so that chunking stays deterministic without a tokenizer dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens
    pub chunk_size: usize,
    /// Tokens carried from the tail of one chunk into the next
    pub chunk_overlap: usize,
    /// Chunks with fewer tokens than this are dropped as noise
    pub min_chunk_size: usize,
}

impl ChunkingConfig {
    /// Create a new chunking configuration
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size: 8,
        }
    }

    /// Set minimum chunk size
    pub fn with_min_chunk_size(mut self, min_size: usize) -> Self {
        self.min_chunk_size = min_size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be greater than 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(DomainError::validation(
                "chunk_overlap must be less than chunk_size",
            ));
        }

        if self.min_chunk_size > self.chunk_size {
            return Err(DomainError::validation(
                "min_chunk_size must be less than or equal to chunk_size",
            ));
        }

        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 80,
            min_chunk_size: 8,
        }
    }
}

/// Metadata for a produced chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Index of this chunk (0-based)
    pub chunk_index: usize,
    /// Total number of chunks produced from the text
    pub total_chunks: usize,
    /// Approximate token count of the chunk
    pub token_count: usize,
}

impl ChunkMetadata {
    pub fn new(chunk_index: usize, total_chunks: usize, token_count: usize) -> Self {
        Self {
            chunk_index,
            total_chunks,
            token_count,
        }
    }
}

/// A chunk of text produced by a chunking strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk content
    pub content: String,
    /// Chunk metadata
    pub metadata: ChunkMetadata,
}

impl TextChunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn index(&self) -> usize {
        self.metadata.chunk_index
    }

    pub fn token_count(&self) -> usize {
        self.metadata.token_count
    }
}

/// Trait for chunking strategies
///
/// Implementations must be deterministic: identical (text, config) inputs
/// always yield an identical ordered chunk list.
pub trait ChunkingStrategy: Send + Sync + Debug {
    /// Split content into chunks
    fn chunk(&self, content: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, DomainError>;

    /// Get the strategy name
    fn name(&self) -> &'static str;
}

/// Helper functions shared by chunking strategies
pub mod helpers {
    /// Approximate token count as whitespace-delimited words
    pub fn approximate_tokens(text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// The last `count` tokens of a text, joined by single spaces
    pub fn trailing_tokens(text: &str, count: usize) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        let start = words.len().saturating_sub(count);
        words[start..].join(" ")
    }
}
