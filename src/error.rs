//! Error types for scamshield-core.

use thiserror::Error;

/// Result type alias using scamshield-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during analysis and alerting operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied input was rejected; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A referenced record does not exist
    #[error("{entity} not found")]
    NotFound { entity: String },

    /// The operation conflicts with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external dependency is unreachable or failing
    #[error("Dependency unavailable: {dependency} - {message}")]
    DependencyUnavailable { dependency: String, message: String },

    /// Remote model API error
    #[error("Model API error: {provider} - {message}")]
    Model { provider: String, message: String },

    /// Store of record error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error for the given entity.
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a dependency-unavailable error.
    pub fn dependency_unavailable(
        dependency: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DependencyUnavailable {
            dependency: dependency.into(),
            message: message.into(),
        }
    }

    /// Create a model API error.
    pub fn model(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Whether this error indicates a retryable dependency failure.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            Self::DependencyUnavailable { .. } | Self::Model { .. }
        )
    }
}
