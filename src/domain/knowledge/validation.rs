//! Validation rules for knowledge base identifiers

use thiserror::Error;

/// Maximum tenant identifier length
pub const MAX_TENANT_ID_LENGTH: usize = 64;

/// Maximum source identifier length
pub const MAX_SOURCE_ID_LENGTH: usize = 255;

/// Maximum entry title length
pub const MAX_TITLE_LENGTH: usize = 500;

/// Validation errors for knowledge base identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KnowledgeValidationError {
    #[error("tenant id must not be empty")]
    EmptyTenantId,

    #[error("tenant id must be at most {MAX_TENANT_ID_LENGTH} characters")]
    TenantIdTooLong,

    #[error("tenant id may only contain alphanumerics, hyphens and underscores")]
    InvalidTenantIdCharacters,

    #[error("source id must not be empty")]
    EmptySourceId,

    #[error("source id must be at most {MAX_SOURCE_ID_LENGTH} characters")]
    SourceIdTooLong,
}

/// Validate a tenant identifier
pub fn validate_tenant_id(id: &str) -> Result<(), KnowledgeValidationError> {
    if id.is_empty() {
        return Err(KnowledgeValidationError::EmptyTenantId);
    }

    if id.len() > MAX_TENANT_ID_LENGTH {
        return Err(KnowledgeValidationError::TenantIdTooLong);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(KnowledgeValidationError::InvalidTenantIdCharacters);
    }

    Ok(())
}

/// Validate a source identifier
pub fn validate_source_id(id: &str) -> Result<(), KnowledgeValidationError> {
    if id.is_empty() {
        return Err(KnowledgeValidationError::EmptySourceId);
    }

    if id.len() > MAX_SOURCE_ID_LENGTH {
        return Err(KnowledgeValidationError::SourceIdTooLong);
    }

    Ok(())
}
