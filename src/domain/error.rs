use thiserror::Error;

/// Core domain errors
///
/// The taxonomy mirrors how failures are handled: validation and not-found
/// errors are rejected before any side effect, transient provider errors are
/// retried with bounded backoff, permanent provider errors fail fast, and
/// storage errors roll back the enclosing transaction.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Transient provider error: {provider} - {message}")]
    TransientProvider { provider: String, message: String },

    #[error("Permanent provider error: {provider} - {message}")]
    PermanentProvider { provider: String, message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn permanent(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PermanentProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the operation may be retried with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientProvider { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("content is empty");
        assert_eq!(error.to_string(), "Validation error: content is empty");
        assert!(!error.is_transient());
    }

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("entry 'abc' not found");
        assert_eq!(error.to_string(), "Not found: entry 'abc' not found");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_transient_is_retryable() {
        let error = DomainError::transient("openai", "rate limit exceeded");
        assert!(error.is_transient());
        assert_eq!(
            error.to_string(),
            "Transient provider error: openai - rate limit exceeded"
        );
    }

    #[test]
    fn test_permanent_is_not_retryable() {
        let error = DomainError::permanent("openai", "invalid credentials");
        assert!(!error.is_transient());
    }
}
