//! Grounded answer types

use serde::Serialize;
use uuid::Uuid;

/// A citation tying answer content back to a retrieved chunk
#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    /// Id of the cited chunk
    pub chunk_id: Uuid,
    /// Short excerpt of the cited content
    pub excerpt: String,
    /// Title of the owning entry
    pub title: String,
}

impl Citation {
    pub fn new(chunk_id: Uuid, excerpt: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            chunk_id,
            excerpt: excerpt.into(),
            title: title.into(),
        }
    }
}

/// Result of answer generation
///
/// `degraded` marks outcomes produced without a model-authored grounded
/// answer; callers must be able to tell a fallback summary apart from a real
/// answer.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub answer: String,
    pub confidence: f32,
    pub citations: Vec<Citation>,
    /// Titles of the entries the citations come from, deduplicated
    pub sources: Vec<String>,
    pub degraded: bool,
    pub processing_time_ms: u64,
}

impl GenerationResult {
    /// A grounded, model-authored answer
    pub fn grounded(answer: impl Into<String>, confidence: f32, citations: Vec<Citation>) -> Self {
        let sources = dedup_titles(&citations);
        Self {
            answer: answer.into(),
            confidence,
            citations,
            sources,
            degraded: false,
            processing_time_ms: 0,
        }
    }

    /// A degraded fallback; never mistakable for a grounded answer
    pub fn degraded(answer: impl Into<String>, citations: Vec<Citation>) -> Self {
        let sources = dedup_titles(&citations);
        Self {
            answer: answer.into(),
            confidence: 0.0,
            citations,
            sources,
            degraded: true,
            processing_time_ms: 0,
        }
    }

    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

fn dedup_titles(citations: &[Citation]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for citation in citations {
        if !citation.title.is_empty() && !sources.contains(&citation.title) {
            sources.push(citation.title.clone());
        }
    }
    sources
}
