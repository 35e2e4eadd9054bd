//! Knowledge base entry entity and related types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{validate_tenant_id, KnowledgeValidationError};

/// Tenant identifier - the multi-tenant isolation boundary
///
/// Alphanumeric plus hyphens/underscores, max 64 characters. Every storage
/// operation is scoped by this id at the storage layer itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Create a new TenantId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, KnowledgeValidationError> {
        let id = id.into();
        validate_tenant_id(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = KnowledgeValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Origin of a knowledge base entry (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Document,
    Product,
    ErpRecord,
    Manual,
    EmailArchive,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Product => "product",
            Self::ErpRecord => "erp_record",
            Self::Manual => "manual",
            Self::EmailArchive => "email_archive",
        }
    }

    /// All known source types
    pub fn all() -> &'static [SourceType] {
        &[
            Self::Document,
            Self::Product,
            Self::ErpRecord,
            Self::Manual,
            Self::EmailArchive,
        ]
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Self::Document),
            "product" => Ok(Self::Product),
            "erp_record" => Ok(Self::ErpRecord),
            "manual" => Ok(Self::Manual),
            "email_archive" => Ok(Self::EmailArchive),
            other => Err(format!("unknown source type '{}'", other)),
        }
    }
}

/// A knowledge base entry holding the full normalized text of one source
///
/// `tenant_id` and `source_type` are fixed at creation; there are no setters
/// for either.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    id: Uuid,
    tenant_id: TenantId,
    source_type: SourceType,
    source_id: String,
    title: String,
    content: String,
    metadata: HashMap<String, serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl KnowledgeBaseEntry {
    /// Create a new entry
    pub fn new(
        tenant_id: TenantId,
        source_type: SourceType,
        source_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            tenant_id,
            source_type,
            source_id: source_id.into(),
            title: title.into(),
            content: content.into(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create with a specific id (for loading from storage)
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    // Getters

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    /// Replace the normalized content
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Metadata-only view of an entry for listings
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub id: Uuid,
    pub source_type: SourceType,
    pub source_id: String,
    pub title: String,
    pub chunk_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for entry listings
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Restrict to the given source types (empty means all)
    pub source_types: Vec<SourceType>,
    /// Restrict to a specific logical source
    pub source_id: Option<String>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_types.push(source_type);
        self
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Whether an entry passes the filter
    pub fn matches(&self, source_type: SourceType, source_id: &str) -> bool {
        if !self.source_types.is_empty() && !self.source_types.contains(&source_type) {
            return false;
        }

        if let Some(ref wanted) = self.source_id {
            return wanted == source_id;
        }

        true
    }
}
