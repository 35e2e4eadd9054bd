//! Ingestion result and option types

use serde::Serialize;
use uuid::Uuid;

/// Per-request overrides for chunking parameters
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn with_chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = Some(overlap);
        self
    }
}

/// Outcome of a successful single-source ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReceipt {
    /// Id of the created or replaced entry
    pub knowledge_base_id: Uuid,
    /// Number of chunks persisted
    pub chunks_created: usize,
    /// Total approximate tokens across persisted chunks
    pub tokens_processed: usize,
}

/// Outcome of one item in a batch ingestion
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemOutcome {
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<IngestionReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemOutcome {
    pub fn succeeded(source_id: impl Into<String>, receipt: IngestionReceipt) -> Self {
        Self {
            source_id: source_id.into(),
            receipt: Some(receipt),
            error: None,
        }
    }

    pub fn failed(source_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            receipt: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.receipt.is_some()
    }
}

/// Per-item report for a bulk ingestion job
///
/// One bad source record must not abort the batch; failures are recorded
/// next to the successes instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchIngestionReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<BatchItemOutcome>,
}

impl BatchIngestionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: BatchItemOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.items.push(outcome);
    }
}
