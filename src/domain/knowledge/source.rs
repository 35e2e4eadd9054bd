//! Typed payloads for each source type
//!
//! Each source type carries its own validated shape, resolved by exhaustive
//! pattern matching rather than runtime field probing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::entity::SourceType;

/// Text format of document-like payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
    Html,
}

/// Raw source payload, tagged by source type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "snake_case")]
pub enum SourceContent {
    Document {
        body: String,
        #[serde(default)]
        format: TextFormat,
    },
    Product {
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        attributes: HashMap<String, String>,
    },
    ErpRecord {
        entity: String,
        fields: HashMap<String, serde_json::Value>,
    },
    Manual {
        body: String,
        #[serde(default)]
        format: TextFormat,
    },
    EmailArchive {
        subject: String,
        #[serde(default)]
        from: String,
        body: String,
    },
}

impl SourceContent {
    /// The source type this payload belongs to
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Document { .. } => SourceType::Document,
            Self::Product { .. } => SourceType::Product,
            Self::ErpRecord { .. } => SourceType::ErpRecord,
            Self::Manual { .. } => SourceType::Manual,
            Self::EmailArchive { .. } => SourceType::EmailArchive,
        }
    }

    /// Convenience constructor for plain-text documents
    pub fn document(body: impl Into<String>) -> Self {
        Self::Document {
            body: body.into(),
            format: TextFormat::Plain,
        }
    }

    /// Convenience constructor for plain-text manuals
    pub fn manual(body: impl Into<String>) -> Self {
        Self::Manual {
            body: body.into(),
            format: TextFormat::Plain,
        }
    }
}
