//! Normalized document type produced from raw source payloads

use std::collections::HashMap;

use serde::Serialize;

/// Canonical plain text plus metadata extracted from a source payload
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedDocument {
    /// Plain text with markup stripped and whitespace collapsed
    pub text: String,
    /// Source-specific metadata (format, entity name, truncation marker, ...)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl NormalizedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
