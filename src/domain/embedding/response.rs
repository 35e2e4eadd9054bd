//! Embedding response types

/// A single embedding vector with its position in the request batch
#[derive(Debug, Clone)]
pub struct Embedding {
    index: usize,
    vector: Vec<f32>,
}

impl Embedding {
    pub fn new(index: usize, vector: Vec<f32>) -> Self {
        Self { index, vector }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn into_vector(self) -> Vec<f32> {
        self.vector
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// Token usage reported by the embedding provider
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

impl EmbeddingUsage {
    pub fn new(prompt_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            total_tokens,
        }
    }

    pub fn prompt_tokens(&self) -> u32 {
        self.prompt_tokens
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }
}

/// Response from an embedding provider
#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    model: String,
    embeddings: Vec<Embedding>,
    usage: EmbeddingUsage,
}

impl EmbeddingResponse {
    pub fn new(model: impl Into<String>, embeddings: Vec<Embedding>, usage: EmbeddingUsage) -> Self {
        Self {
            model: model.into(),
            embeddings,
            usage,
        }
    }

    /// The model that actually produced the vectors
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn usage(&self) -> EmbeddingUsage {
        self.usage
    }

    /// Vectors ordered by their request index
    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        let mut embeddings = self.embeddings;
        embeddings.sort_by_key(|e| e.index());
        embeddings.into_iter().map(|e| e.into_vector()).collect()
    }
}
